//! Business logic services for the Coffee Quality Management Platform

pub mod auth;
pub mod certification;
pub mod cupping;
pub mod grading;
pub mod harvest;
pub mod inventory;
pub mod line_chatbot;
pub mod line_oauth;
pub mod lot;
pub mod notification;
pub mod plot;
pub mod processing;
pub mod roasting;
pub mod role;
pub mod traceability;
pub mod weather;

pub use auth::AuthService;
pub use certification::CertificationService;
pub use cupping::CuppingService;
pub use grading::GradingService;
pub use harvest::HarvestService;
pub use inventory::InventoryService;
pub use line_chatbot::LineChatbotService;
pub use line_oauth::LineOAuthService;
pub use lot::LotService;
pub use notification::NotificationService;
pub use plot::PlotService;
pub use processing::ProcessingService;
pub use roasting::RoastingService;
pub use role::RoleService;
pub use traceability::TraceabilityService;
pub use weather::WeatherService;
