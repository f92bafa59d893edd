//! Outgoing email.
//!
//! With SMTP configured messages go through `lettre`. Without it the
//! rendered message is logged, which is what development relies on.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use tracing::{info, warn};

use crate::config::{Config, SmtpSettings};
use crate::error::{AppError, AppResult};

pub const PASSWORD_RESET_SUBJECT: &str = "Restablecer contraseña";

pub const PASSWORD_RESET_TEMPLATE: &str = "Hola {{nombre}},\n\n\
Recibimos una solicitud para restablecer tu contraseña.\n\
Abre el siguiente enlace para elegir una nueva (válido por 1 hora):\n\n\
{{enlace}}\n\n\
Si no solicitaste el cambio, ignora este mensaje.\n";

/// Replace every `{{key}}` with its value. Unknown placeholders stay as is.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{{{}}}}}", key), value)
    })
}

enum Transport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    Log { production: bool },
}

pub struct Mailer {
    transport: Transport,
    from: Mailbox,
    frontend_url: String,
}

impl Mailer {
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let from: Mailbox = config
            .smtp
            .from
            .parse()
            .map_err(|e| AppError::InvalidInput(format!("Invalid MAIL_FROM address: {}", e)))?;

        let transport = match config.smtp.host.as_deref() {
            Some(host) => Transport::Smtp(smtp_transport(host, &config.smtp)?),
            None => {
                if config.environment.is_production() {
                    warn!("SMTP is not configured; emails will only be logged");
                }
                Transport::Log {
                    production: config.environment.is_production(),
                }
            }
        };

        Ok(Self {
            transport,
            from,
            frontend_url: config.frontend_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn password_reset_link(&self, token: &str) -> String {
        format!(
            "{}/restablecer-password?token={}",
            self.frontend_url,
            urlencoding::encode(token)
        )
    }

    pub async fn send_password_reset(&self, to_email: &str, to_name: &str, token: &str) -> AppResult<()> {
        let link = self.password_reset_link(token);
        let body = render(
            PASSWORD_RESET_TEMPLATE,
            &[("nombre", to_name), ("enlace", &link)],
        );
        self.send(to_email, PASSWORD_RESET_SUBJECT, body).await
    }

    async fn send(&self, to_email: &str, subject: &str, body: String) -> AppResult<()> {
        match &self.transport {
            Transport::Smtp(transport) => {
                let to: Mailbox = to_email
                    .parse()
                    .map_err(|e| AppError::InvalidInput(format!("Invalid recipient: {}", e)))?;
                let message = Message::builder()
                    .from(self.from.clone())
                    .to(to)
                    .subject(subject)
                    .header(ContentType::TEXT_PLAIN)
                    .body(body)
                    .map_err(|e| AppError::Upstream(format!("Failed to build email: {}", e)))?;
                transport
                    .send(message)
                    .await
                    .map_err(|e| AppError::Upstream(format!("SMTP send failed: {}", e)))?;
                info!(to = %to_email, subject, "Email sent");
            }
            Transport::Log { production: false } => {
                info!(to = %to_email, subject, body = %body, "Email (not sent, SMTP not configured)");
            }
            Transport::Log { production: true } => {
                warn!(to = %to_email, subject, "Email dropped, SMTP not configured");
            }
        }
        Ok(())
    }
}

fn smtp_transport(host: &str, settings: &SmtpSettings) -> AppResult<AsyncSmtpTransport<Tokio1Executor>> {
    let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        .map_err(|e| AppError::Upstream(format!("Invalid SMTP host {}: {}", host, e)))?
        .port(settings.port);
    if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
        builder = builder.credentials(Credentials::new(
            username.clone(),
            password.expose_secret().to_string(),
        ));
    }
    info!("SMTP transport configured for {}:{}", host, settings.port);
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;

    #[test]
    fn test_render_replaces_every_occurrence() {
        let out = render("{{a}} y {{a}} con {{b}} y {{c}}", &[("a", "1"), ("b", "2")]);
        assert_eq!(out, "1 y 1 con 2 y {{c}}");
    }

    #[test]
    fn test_reset_template() {
        let body = render(
            PASSWORD_RESET_TEMPLATE,
            &[("nombre", "Ana"), ("enlace", "http://x/y")],
        );
        assert!(body.starts_with("Hola Ana,"));
        assert!(body.contains("http://x/y"));
        assert!(!body.contains("{{"));
    }

    #[tokio::test]
    async fn test_log_transport_accepts_mail() {
        let mailer = Mailer::from_config(&test_config()).unwrap();
        let link = mailer.password_reset_link("tok en");
        assert!(link.ends_with("token=tok%20en"), "{}", link);
        mailer
            .send_password_reset("ana@example.com", "Ana", "tok")
            .await
            .unwrap();
    }
}
