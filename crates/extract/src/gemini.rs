//! Google Gemini `generateContent` backend.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use khatt_core::ExtractionSettings;
use serde::Deserialize;
use std::time::Duration;

use crate::backend::{BackendError, ExtractionBackend};
use crate::prepare::PreparedImage;

/// Instruction sent with every image. Asks for full Arabic names and 14-digit
/// national IDs as a bare JSON object with a `records` array.
pub const EXTRACTION_PROMPT: &str = r#"أنت خبير في قراءة النصوص العربية المكتوبة بخط اليد. يرجى تحليل هذه الصورة واستخراج جميع الأسماء الكاملة والأرقام القومية (الرقم الوطني).

الرجاء الرد بصيغة JSON فقط بدون أي نص إضافي، كالتالي:
{
  "records": [
    {
      "name": "الاسم الكامل بالعربية",
      "nationalId": "الرقم القومي (14 رقم)"
    }
  ]
}

ملاحظات مهمة:
- الرقم القومي يجب أن يكون 14 رقم فقط
- استخرج جميع الأسماء والأرقام من الصورة
- إذا لم تجد بيانات واضحة، أرجع مصفوفة فارغة
- تأكد من دقة البيانات المستخرجة"#;

const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiBackend {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    pub fn from_settings(settings: &ExtractionSettings) -> Result<Self, BackendError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| BackendError::NotConfigured("GEMINI_API_KEY is not set".into()))?;
        Self::new(
            api_key,
            settings.model.clone(),
            settings.base_url.clone(),
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    fn request_body(image: &PreparedImage) -> serde_json::Value {
        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": EXTRACTION_PROMPT },
                    {
                        "inline_data": {
                            "mime_type": image.kind.mime_type(),
                            "data": BASE64_STANDARD.encode(&image.bytes),
                        }
                    }
                ]
            }],
            "generationConfig": {
                "temperature": 0.1,
                "responseMimeType": "application/json"
            }
        })
    }
}

/// Concatenate the text parts of the first candidate.
fn reply_text(response: GenerateContentResponse) -> Result<String, BackendError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(BackendError::EmptyReply);
    }
    Ok(text)
}

#[async_trait]
impl ExtractionBackend for GeminiBackend {
    async fn generate(&self, image: &PreparedImage) -> Result<String, BackendError> {
        let resp = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(image))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let mut body = resp.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| body.is_char_boundary(*i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            return Err(BackendError::Status { status: status.as_u16(), body });
        }

        let parsed: GenerateContentResponse = resp.json().await?;
        reply_text(parsed)
    }
}
