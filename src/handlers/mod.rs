// 3-tier handler layout:
// Public (no session) -> Protected (session + scope) -> Elevated (admin only)
pub mod elevated;
pub mod protected;
pub mod public;
