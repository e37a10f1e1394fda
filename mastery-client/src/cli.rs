use clap::{Args, Parser, Subcommand};
use mastery_client::identity::Session;
use mastery_shared::models::UserId;

#[derive(Debug, Parser)]
#[command(name = "mastery-client")]
#[command(about = "Drives the Medicare Mastery purchase flow against a running API")]
#[command(version)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    /// Defaults to `gate` for the configured application root
    #[command(subcommand)]
    pub(crate) command: Option<Commands>,

    #[command(flatten)]
    pub(crate) session: SessionArgs,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub(crate) enum Commands {
    /// Print the view a location renders for the current session
    Gate {
        /// Host name (defaults to the application host)
        host: Option<String>,

        #[arg(default_value = "/")]
        path: String,
    },

    /// Sign in and print where the login view sends the user
    Login,

    /// Record an enrollment for the signed-in user
    Enroll {
        full_name: String,

        phone: String,

        /// Contact email (defaults to the session email)
        #[arg(value_name = "EMAIL")]
        contact_email: Option<String>,
    },

    /// Print the checkout link attributed to the signed-in user
    Checkout,

    /// Wait for the payment webhook like the success page does
    Success {
        /// Host serving the success page (defaults to the application host)
        host: Option<String>,
    },
}

/// Identity provider session handed over by the caller
#[derive(Debug, Default, Args)]
pub(crate) struct SessionArgs {
    /// Signed-in user id
    #[arg(long, global = true, env = "MASTERY_USER_ID")]
    pub(crate) user_id: Option<String>,

    /// Bearer token issued with the session
    #[arg(long, global = true, env = "MASTERY_ACCESS_TOKEN", hide_env_values = true)]
    pub(crate) access_token: Option<String>,

    #[arg(long, global = true, env = "MASTERY_USER_EMAIL")]
    pub(crate) email: Option<String>,
}

impl SessionArgs {
    /// `None` unless both a non-blank user id and a token are present.
    pub(crate) fn session(&self) -> Option<Session> {
        let user_id = self.user_id.as_deref().and_then(UserId::parse)?;
        let token = self.access_token.clone()?;

        Some(Session::new(user_id, self.email.clone(), token))
    }
}
