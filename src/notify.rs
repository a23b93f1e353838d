use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde_json::json;

use crate::models::Appointment;

/// Telegram notifier for the clinic owner's chat. Without a bot token
/// and chat id it stays silent and the booking flow is unaffected.
#[derive(Clone)]
pub struct Notifier {
    http: Client,
    bot_token: Option<String>,
    chat_id: Option<String>,
}

impl Notifier {
    pub fn new(bot_token: Option<String>, chat_id: Option<String>) -> anyhow::Result<Self> {
        if bot_token.is_none() || chat_id.is_none() {
            tracing::warn!(
                "telegram notifications disabled, TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID not set"
            );
        }

        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            http,
            bot_token,
            chat_id,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }

    async fn send_message(&self, text: &str) -> anyhow::Result<()> {
        let (Some(token), Some(chat_id)) = (&self.bot_token, &self.chat_id) else {
            return Ok(());
        };

        let url = format!("https://api.telegram.org/bot{token}/sendMessage");
        self.http
            .post(&url)
            .json(&json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Queue a new-booking notification. The request task runs in the
    /// background, delivery failures are logged and never reach the
    /// caller.
    pub fn spawn_booking_notification(&self, appointment: &Appointment) {
        self.spawn_send(booking_message(appointment));
    }

    /// Queue a cancellation notification, same fire-and-forget rules.
    pub fn spawn_cancellation_notification(&self, appointment: &Appointment) {
        self.spawn_send(cancellation_message(appointment));
    }

    fn spawn_send(&self, text: String) {
        if !self.is_configured() {
            return;
        }
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send_message(&text).await {
                tracing::warn!("telegram notification failed: {e:#}");
            }
        });
    }
}

/* ============================================================
   Message formatting
   ============================================================ */

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// "2026-09-01" into "Tuesday, September 1, 2026". Unparseable input
/// is passed through untouched.
fn format_date(date: &str) -> String {
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(d) => d.format("%A, %B %-d, %Y").to_string(),
        Err(_) => date.to_string(),
    }
}

/// Thousands groups separated by spaces, as prices are written locally.
fn format_price(value: i64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

fn booking_message(a: &Appointment) -> String {
    let mut msg = format!(
        "🆕 <b>New appointment!</b>\n\n\
         👤 <b>Patient:</b> {}\n\
         📞 <b>Phone:</b> {}\n\n\
         🏥 <b>Service:</b> {}\n\
         📝 <b>Description:</b> {}\n\
         ⏱ <b>Duration:</b> {} min\n\
         💰 <b>Price:</b> {} ₸\n\n\
         📅 <b>Date:</b> {}\n\
         🕐 <b>Time:</b> {}\n",
        escape_html(&a.patient_name),
        escape_html(&a.patient_phone),
        escape_html(&a.service_type.name),
        escape_html(&a.service_type.description),
        a.service_type.duration,
        format_price(a.service_type.price),
        format_date(&a.date),
        a.time,
    );

    if let Some(problem) = &a.problem_description {
        msg.push_str(&format!("\n💬 <b>Problem:</b>\n{}\n", escape_html(problem)));
    }

    msg.push_str(&format!(
        "\n📋 <b>Booking id:</b> {}\n⏰ <b>Created:</b> {}",
        a.id,
        a.created_at.format("%Y-%m-%d %H:%M UTC"),
    ));
    msg
}

fn cancellation_message(a: &Appointment) -> String {
    format!(
        "❌ <b>Appointment cancelled</b>\n\n\
         👤 <b>Patient:</b> {}\n\
         📞 <b>Phone:</b> {}\n\n\
         🏥 <b>Service:</b> {}\n\
         📅 <b>Date:</b> {}\n\
         🕐 <b>Time:</b> {}\n\n\
         📋 <b>Booking id:</b> {}",
        escape_html(&a.patient_name),
        escape_html(&a.patient_phone),
        escape_html(&a.service_type.name),
        format_date(&a.date),
        a.time,
        a.id,
    )
}
