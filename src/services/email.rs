//! Email service for account mails and lending reminders

use chrono::{DateTime, Utc};
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
};

#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

/// Subject and plain-text body of an outgoing mail
#[derive(Debug, Clone, PartialEq)]
pub struct EmailContent {
    pub subject: String,
    pub body: String,
}

pub fn confirmation_email(username: &str, link: &str) -> EmailContent {
    EmailContent {
        subject: "Confirm your MyVentory account".to_string(),
        body: format!(
            r#"
Hello {username},

Please confirm your email address by opening the link below:

{link}

If you did not create a MyVentory account, you can ignore this email.
"#
        ),
    }
}

pub fn password_reset_email(username: &str, link: &str, ttl_minutes: u64) -> EmailContent {
    EmailContent {
        subject: "Reset your MyVentory password".to_string(),
        body: format!(
            r#"
Hello {username},

A password reset was requested for your account. Open the link below to choose a new password:

{link}

This link expires in {ttl_minutes} minutes. If you did not request it, ignore this email.
"#
        ),
    }
}

pub fn due_reminder_email(
    borrower: &str,
    lender: &str,
    lending_id: i32,
    due_date: DateTime<Utc>,
) -> EmailContent {
    EmailContent {
        subject: format!("Reminder: items borrowed from {} are due soon", lender),
        body: format!(
            r#"
Hello {borrower},

The items you borrowed from {lender} (lending #{lending_id}) are due back on {due}.

Please get in touch with {lender} to arrange the return.
"#,
            due = due_date.format("%Y-%m-%d %H:%M UTC")
        ),
    }
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Send a prepared mail. With delivery disabled the mail is logged instead.
    pub async fn send(&self, to: &str, content: &EmailContent) -> AppResult<()> {
        if !self.config.enabled {
            tracing::info!(to = %to, subject = %content.subject, "Email delivery disabled, not sending");
            tracing::debug!(body = %content.body, "Email body");
            return Ok(());
        }

        let message = self.build_message(to, content)?;
        let mailer = self.mailer()?;

        // SmtpTransport is blocking
        tokio::task::spawn_blocking(move || mailer.send(&message))
            .await
            .map_err(|e| AppError::Internal(format!("Email task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        tracing::info!(to = %to, subject = %content.subject, "Email sent");
        Ok(())
    }

    fn build_message(&self, to: &str, content: &EmailContent) -> AppResult<Message> {
        let from_name = self.config.smtp_from_name.as_deref().unwrap_or("MyVentory");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Validation(format!("Invalid recipient address: {}", e)))?;

        Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(content.subject.clone())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(content.body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(format!(
                                "<html><body><p>{}</p></body></html>",
                                content.body.trim().replace('\n', "<br>")
                            )),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))
    }

    fn mailer(&self) -> AppResult<SmtpTransport> {
        let builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let builder = match (&self.config.smtp_username, &self.config.smtp_password) {
            (Some(username), Some(password)) => {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => builder,
        };

        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_reminder_mentions_lender_and_date() {
        let due = Utc.with_ymd_and_hms(2024, 5, 17, 12, 0, 0).unwrap();
        let mail = due_reminder_email("bob", "alice", 42, due);
        assert!(mail.subject.contains("alice"));
        assert!(mail.body.contains("#42"));
        assert!(mail.body.contains("2024-05-17"));
    }

    #[test]
    fn test_account_mails_carry_link() {
        let link = "http://localhost:3000/confirm-email?token=abc";
        assert!(confirmation_email("bob", link).body.contains(link));
        let reset = password_reset_email("bob", link, 60);
        assert!(reset.body.contains(link));
        assert!(reset.body.contains("60 minutes"));
    }

    #[tokio::test]
    async fn test_disabled_delivery_only_logs() {
        let service = EmailService::new(EmailConfig::default());
        let mail = confirmation_email("bob", "http://x");
        tokio_test::assert_ok!(service.send("bob@example.com", &mail).await);
    }

    #[test]
    fn test_invalid_recipient() {
        let service = EmailService::new(EmailConfig::default());
        let mail = confirmation_email("bob", "http://x");
        assert!(matches!(
            service.build_message("not an address", &mail),
            Err(AppError::Validation(_))
        ));
    }
}
