//! # Offline Submission
//!
//! Work the user creates without connectivity is saved locally first and
//! replayed when the network returns. Appointments are the only queued
//! operation today.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use healthsync::client::offline::AppointmentRequest;
//!
//! # async fn example(queue: healthsync::client::offline::AppointmentQueue) {
//! let saved = queue
//!     .submit_offline(AppointmentRequest::new("h1", "Jane"))
//!     .await
//!     .expect("valid request");
//! println!("saved {} as {:?}", saved.id, saved.status);
//!
//! // Later, once connectivity is back:
//! let report = queue.replay(true).await;
//! println!("{} confirmed", report.confirmed.len());
//! # }
//! ```

pub mod queue;

pub use queue::{
    AppointmentQueue, AppointmentRequest, AppointmentStatus, AppointmentSubmitter,
    HttpAppointmentSubmitter, PendingAppointment, ReplayReport,
};
