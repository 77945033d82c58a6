pub mod campaign;
pub mod intent;
