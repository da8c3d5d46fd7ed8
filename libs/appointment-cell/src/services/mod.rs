pub mod agenda;
pub mod conflict;
pub mod scheduling;
