pub mod excuse;
pub mod severity;
