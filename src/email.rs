use lettre::message::{MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, instrument};

use unimedia_auth::tokens::VERIFICATION_TOKEN_TTL_HOURS;
use unimedia_config::EmailConfig;
use unimedia_core::AppError;

pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Sends the account verification link. A no-op when SMTP is disabled.
    #[instrument(skip(self, token))]
    pub async fn send_verification_email(
        &self,
        to_email: &str,
        username: &str,
        token: &str,
    ) -> Result<(), AppError> {
        if !self.config.enabled {
            debug!("SMTP disabled, skipping verification email");
            return Ok(());
        }

        let link = self.config.verification_link(token);
        let text_body = format!(
            "Hi {username},\n\n\
             Welcome to Unimedia. Confirm your email address by opening the link below:\n\
             {link}\n\n\
             The link expires in {VERIFICATION_TOKEN_TTL_HOURS} hours.\n\n\
             If you did not create an account, you can ignore this email."
        );
        let html_body = verification_template(username, &link);

        self.send_email(to_email, "Verify your email address", &text_body, &html_body)
            .await
    }

    #[instrument(skip(self, text_body, html_body))]
    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), AppError> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        let email = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| AppError::internal_error(format!("Invalid from email: {e}")))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| AppError::internal_error(format!("Invalid to email: {e}")))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| AppError::internal_error(format!("Failed to build email: {e}")))?;

        let mailer = if self.config.smtp_username.is_empty() {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.smtp_host)
                .port(self.config.smtp_port)
                .build()
        } else {
            let creds = Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            );

            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
                .map_err(|e| AppError::internal_error(format!("Failed to create SMTP relay: {e}")))?
                .port(self.config.smtp_port)
                .credentials(creds)
                .build()
        };

        mailer
            .send(email)
            .await
            .map_err(|e| AppError::internal_error(format!("Failed to send email: {e}")))?;

        Ok(())
    }
}

fn verification_template(username: &str, link: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Verify your email address</title>
</head>
<body style="margin: 0; padding: 24px; font-family: Arial, sans-serif; background-color: #f4f4f4;">
    <table width="600" cellpadding="0" cellspacing="0" align="center" style="background-color: #ffffff; border-radius: 8px;">
        <tr>
            <td style="background-color: #0F766E; padding: 24px; text-align: center;">
                <h1 style="margin: 0; color: #ffffff; font-size: 26px;">Unimedia</h1>
            </td>
        </tr>
        <tr>
            <td style="padding: 32px; color: #444444; font-size: 16px; line-height: 1.5;">
                <p>Hi <strong>{username}</strong>,</p>
                <p>Confirm your email address to finish setting up your account.</p>
                <p style="text-align: center; margin: 28px 0;">
                    <a href="{link}" style="padding: 12px 36px; background-color: #0F766E; color: #ffffff; text-decoration: none; border-radius: 6px; font-weight: bold;">Verify email</a>
                </p>
                <p style="font-size: 14px;">Or paste this link into your browser:<br><span style="color: #0F766E; word-break: break-all;">{link}</span></p>
                <p style="font-size: 14px;">The link expires in {VERIFICATION_TOKEN_TTL_HOURS} hours.</p>
            </td>
        </tr>
    </table>
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_smtp_is_noop() {
        let service = EmailService::new(EmailConfig::disabled());
        let result = service
            .send_verification_email("ada@example.com", "ada", "token")
            .await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_template_contains_link() {
        let html = verification_template("ada", "http://localhost:3000/verify-email?token=abc");
        assert!(html.contains("ada"));
        assert!(html.contains("verify-email?token=abc"));
    }
}
