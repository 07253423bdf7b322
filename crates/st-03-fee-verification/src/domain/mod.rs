pub mod fee;
pub mod lock;
