use reqwest::Client;
use serde::Serialize;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    api_key: String,
    from_email: String,
    from_name: String,
}

#[derive(Debug, Serialize)]
struct ResendRequest {
    from: String,
    to: Vec<String>,
    subject: String,
    html: String,
}

impl EmailClient {
    pub fn new(api_key: &str, from_email: &str, from_name: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            from_email: from_email.to_string(),
            from_name: from_name.to_string(),
        }
    }

    pub async fn send_email(
        &self,
        to: &str,
        subject: &str,
        html: &str,
    ) -> Result<(), String> {
        let request = ResendRequest {
            from: format!("{} <{}>", self.from_name, self.from_email),
            to: vec![to.to_string()],
            subject: subject.to_string(),
            html: html.to_string(),
        };

        let response = self.client
            .post(RESEND_ENDPOINT)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("email send failed: {e}"))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("email API error: {body}"));
        }

        tracing::debug!(to = %to, subject = %subject, "email sent");
        Ok(())
    }

    pub async fn send_verification_code(&self, to: &str, code: &str) -> Result<(), String> {
        self.send_email(to, "Troth - Confirm your email", &verification_code_html(code)).await
    }

    pub async fn send_account_notice(&self, to: &str, headline: &str, body: &str) -> Result<(), String> {
        let html = format!(
            r#"<div style="font-family: Georgia, serif; max-width: 600px; margin: 0 auto;">
            <h2 style="color: #b4234d;">{headline}</h2>
            <p>{body}</p>
            </div>"#
        );
        self.send_email(to, &format!("Troth - {headline}"), &html).await
    }
}

fn verification_code_html(code: &str) -> String {
    format!(
        r#"<div style="font-family: Georgia, serif; max-width: 600px; margin: 0 auto;">
        <h2 style="color: #b4234d;">Welcome to Troth</h2>
        <p>Enter this code to confirm your email address:</p>
        <div style="background: #fff4f6; color: #b4234d; font-size: 32px; font-weight: bold; text-align: center; padding: 20px; border-radius: 8px; letter-spacing: 8px;">{code}</div>
        <p style="color: #666; margin-top: 20px;">The code expires in 15 minutes.</p>
        </div>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_embedded_in_template() {
        let html = verification_code_html("042917");
        assert!(html.contains("042917"));
        assert!(html.contains("15 minutes"));
    }
}
