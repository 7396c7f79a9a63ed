//! Outbound Telegram alerting. Transport internals (bot command handling,
//! long polling) are out of scope; this sends fire-and-forget messages for
//! the events `config::TelegramAppConfig` enables.

use teloxide::prelude::*;
use tracing::warn;

use super::{Event, Notifier};

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub notify_fills: bool,
    pub notify_halts: bool,
    pub notify_daily_summary: bool,
}

impl TelegramConfig {
    /// Reads `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID` from the environment.
    /// Returns `None` if either is unset.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok()?;
        Some(Self { bot_token, chat_id, notify_fills: true, notify_halts: true, notify_daily_summary: false })
    }
}

pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
    config: TelegramConfig,
    runtime: tokio::runtime::Handle,
}

impl TelegramNotifier {
    /// # Panics
    /// Panics if called outside a running Tokio runtime; the orchestrator
    /// always constructs notifiers from within `#[tokio::main]`.
    #[must_use]
    pub fn new(config: TelegramConfig) -> Self {
        let bot = Bot::new(&config.bot_token);
        let chat_id = ChatId(config.chat_id.parse().unwrap_or(0));
        Self { bot, chat_id, config, runtime: tokio::runtime::Handle::current() }
    }

    fn send(&self, text: String) {
        let bot = self.bot.clone();
        let chat_id = self.chat_id;
        self.runtime.spawn(async move {
            if let Err(err) = bot.send_message(chat_id, text).await {
                warn!(error = %err, "telegram send failed");
            }
        });
    }
}

impl Notifier for TelegramNotifier {
    fn notify(&self, event: Event) {
        let text = match event {
            Event::Fill { token_id, side, price, size, .. } if self.config.notify_fills => {
                format!("fill: {token_id} {side:?} {size}@{price}")
            }
            Event::CircuitBreakerTransition { from, to, reason } if self.config.notify_halts => {
                format!("circuit breaker {} -> {}: {reason}", from.as_str(), to.as_str())
            }
            Event::RedemptionFailed { token_id, reason } => {
                format!("redemption failed for {token_id}: {reason}")
            }
            Event::DailySummary(s) if self.config.notify_daily_summary => {
                format!("{}: {} fills, pnl {}, exposure {}", s.date, s.fills, s.realized_pnl, s.total_exposure)
            }
            _ => return,
        };
        self.send(text);
    }
}
