//! Outbound email.
//!
//! Welcome and password-reset notifications over SMTP. Sends are
//! fire-and-forget: a mail failure is logged and never fails the request
//! that triggered it.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{error, info, warn};

/// SMTP settings; absent configuration disables sending entirely.
#[derive(Debug, Clone)]
struct MailConfig {
    smtp_server: String,
    smtp_user: String,
    smtp_pass: String,
    from_email: String,
    frontend_url: String,
}

/// Outbound mail sender.
#[derive(Clone)]
pub struct Mailer {
    config: Option<MailConfig>,
}

impl Mailer {
    /// Build from environment; missing SMTP settings produce a disabled
    /// mailer that only logs.
    pub fn from_env() -> Self {
        let config = (|| {
            Some(MailConfig {
                smtp_server: std::env::var("SMTP_SERVER").ok()?,
                smtp_user: std::env::var("SMTP_USER").ok()?,
                smtp_pass: std::env::var("SMTP_PASS").ok()?,
                from_email: std::env::var("FROM_EMAIL").ok()?,
                frontend_url: std::env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| "http://localhost:5000".to_string()),
            })
        })();

        if config.is_none() {
            warn!("SMTP not configured; outbound email disabled");
        }

        Self { config }
    }

    /// A mailer that never sends; used in tests.
    pub fn disabled() -> Self {
        Self { config: None }
    }

    /// Welcome mail after registration.
    pub fn send_welcome(&self, email: &str, name: &str) {
        let body = format!(
            "<h2>Welcome to JobPort!</h2>\
             <p>Hello {},</p>\
             <p>Thank you for registering. Your account has been created.</p>\
             <p>You can now browse job listings, apply for positions, and manage your profile.</p>\
             <p>Best regards,<br>The JobPort Team</p>",
            name
        );
        self.send(email, "Welcome to JobPort", body);
    }

    /// Password-reset mail carrying the reset link.
    pub fn send_reset(&self, email: &str, reset_token: &str) {
        let reset_url = match &self.config {
            Some(c) => format!("{}/reset-password?token={}", c.frontend_url, reset_token),
            None => return,
        };
        let body = format!(
            "<h2>Password Reset Request</h2>\
             <p>Hello,</p>\
             <p>You requested a password reset for your account. \
             Click the link below to choose a new password:</p>\
             <p><a href=\"{}\">Reset password</a></p>\
             <p>If you didn't request this, please ignore this email. \
             The link expires in 1 hour.</p>",
            reset_url
        );
        self.send(email, "Password Reset Request", body);
    }

    fn send(&self, to: &str, subject: &str, html_body: String) {
        let Some(config) = self.config.clone() else {
            info!(to = %to, subject = %subject, "Email disabled, skipping send");
            return;
        };

        let to = to.to_string();
        let subject = subject.to_string();

        // SMTP is blocking; push the whole send off the async runtime and
        // let the request complete regardless of the outcome.
        tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || {
                let message = Message::builder()
                    .from(format!("JobPort <{}>", config.from_email).parse()?)
                    .to(to.parse()?)
                    .subject(subject)
                    .header(ContentType::TEXT_HTML)
                    .body(html_body)?;

                let creds = Credentials::new(config.smtp_user, config.smtp_pass);
                let mailer = SmtpTransport::relay(&config.smtp_server)?
                    .credentials(creds)
                    .build();

                mailer.send(&message)?;
                Ok::<_, Box<dyn std::error::Error + Send + Sync>>(())
            })
            .await;

            match result {
                Ok(Ok(())) => info!("Email sent"),
                Ok(Err(e)) => error!("Could not send email: {}", e),
                Err(e) => error!("Email task failed: {}", e),
            }
        });
    }
}
