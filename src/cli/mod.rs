use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::auth::password;
use crate::database::Database;

#[derive(Parser)]
#[command(name = "fleetctl")]
#[command(about = "Fleet CLI - operational commands for the fleet management API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the API server")]
    Serve {
        #[arg(long, help = "Port to bind (falls back to FLEET_API_PORT, then 3000)")]
        port: Option<u16>,
    },

    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Create a platform admin account")]
    CreateAdmin {
        #[arg(help = "Admin email address")]
        email: String,
        #[arg(help = "Admin password")]
        password: String,
        #[arg(long, default_value = "Administrator", help = "Display name")]
        name: String,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { port } => serve(port).await,
        Commands::Migrate => {
            Database::migrate().await.context("migration failed")?;
            println!("migrations applied");
            Ok(())
        }
        Commands::CreateAdmin {
            email,
            password,
            name,
        } => create_admin(&email, &password, &name).await,
    }
}

async fn serve(port: Option<u16>) -> anyhow::Result<()> {
    let config = crate::config::config();
    tracing::info!("starting Fleet API in {:?} mode", config.environment);

    let port = port
        .or_else(|| {
            std::env::var("FLEET_API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
        })
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    println!("Fleet API server listening on http://{}", bind_addr);

    axum::serve(listener, crate::routes::app())
        .await
        .context("server error")?;
    Ok(())
}

async fn create_admin(email: &str, password: &str, name: &str) -> anyhow::Result<()> {
    let pool = Database::pool().await.context("database unavailable")?;
    let password_hash = password::hash_password(password);

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO users (email, password_hash, name, role) VALUES ($1, $2, $3, 'admin') RETURNING id",
    )
    .bind(email)
    .bind(&password_hash)
    .bind(name)
    .fetch_one(&pool)
    .await
    .context("failed to create admin user")?;

    println!("created admin user {} ({})", email, id);
    Ok(())
}
