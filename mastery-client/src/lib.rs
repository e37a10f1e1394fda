//! # Medicare Mastery Client Library
//!
//! Client-side half of the purchase flow: who is signed in, whether they may
//! see the program, and the post-checkout wait for the payment webhook.
//!
//! ## Modules
//!
//! - `config`: Client configuration (URLs, hosts, poller timings)
//! - `identity`: Identity provider sessions
//! - `source`: Account reads and enrollment writes (direct store or HTTP API)
//! - `session`: Session context publishing the signed-in account
//! - `gate`: Route gate deciding which view a location renders
//! - `poller`: Post-checkout entitlement poller
//! - `countdown`: Visible countdown before the post-purchase redirect
//! - `navigator`: Location changes
//! - `enroll`: Enrollment and checkout hand-off
//!
//! ## Example
//!
//! ```
//! use mastery_client::gate::{decide, AuthState, GateConfig, GateDecision, GateInput, View};
//!
//! let config = GateConfig::default();
//! let decision = decide(
//!     &config,
//!     &GateInput {
//!         host: "app.medicaremastery.app",
//!         path: "/",
//!         auth: AuthState::SignedIn { has_access: true },
//!     },
//! );
//! assert_eq!(decision, GateDecision::Render(View::Dashboard));
//! ```

pub mod config;
pub mod countdown;
pub mod enroll;
pub mod gate;
pub mod identity;
pub mod navigator;
pub mod poller;
pub mod session;
pub mod source;
