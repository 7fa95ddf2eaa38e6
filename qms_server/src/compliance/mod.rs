//! Pure compliance rules shared by every feature area.

pub mod iso;
pub mod ohs;
pub mod rag;
pub mod reference;
pub mod review;
pub mod risk;
