//! Text and buttons for every view, in the bot's single (Russian) locale.

use feeding_core::{Action, CompletedFeeding, FeedingError, Keyboard, PromptKind, View};

/// Callback data carried by the inline buttons.
pub const START_FEEDING: &str = "start_feeding";
pub const FINISH_FEEDING: &str = "finish_feeding";
pub const CANCEL_FEEDING: &str = "cancel_feeding";

/// Toasts shown when a button press succeeded.
pub const FINISH_ACCEPTED: &str = "✅ Введите количество съеденного в мл";
pub const CANCEL_ACCEPTED: &str = "❌ Кормление отменено!";

const DATE_FORMAT: &str = "%d.%m.%Y";
const TIME_FORMAT: &str = "%H:%M";

/// A single inline keyboard button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Button rows for a layout.
pub fn keyboard_rows(keyboard: Keyboard) -> Vec<Vec<InlineButton>> {
    match keyboard {
        Keyboard::Start => vec![vec![InlineButton::new("🍼 Начать кормление", START_FEEDING)]],
        Keyboard::FinishOrCancel => vec![vec![
            InlineButton::new("✅ Завершить кормление", FINISH_FEEDING),
            InlineButton::new("❌ Отменить кормление", CANCEL_FEEDING),
        ]],
    }
}

/// Bot API `reply_markup` object for a layout.
pub fn reply_markup(keyboard: Keyboard) -> serde_json::Value {
    let rows: Vec<Vec<serde_json::Value>> = keyboard_rows(keyboard)
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|btn| {
                    serde_json::json!({
                        "text": btn.text,
                        "callback_data": btn.callback_data
                    })
                })
                .collect()
        })
        .collect();

    serde_json::json!({ "inline_keyboard": rows })
}

pub fn render(view: &View) -> String {
    match view {
        View::Help => [
            "👶 Бот для отслеживания кормлений",
            "",
            "Команды:",
            "/start - Начать работу",
            "/help - Показать справку",
            "/feeding - Начать кормление",
            "/end_feeding - Завершить кормление",
            "/cancel - Отменить кормление",
            "",
            "Просто нажмите кнопку ниже, чтобы начать:",
        ]
        .join("\n"),
        View::Started {
            initiator,
            started_at,
            prepared_ml,
        } => {
            let mut lines = vec![
                "🍼 Кормление начато!".to_string(),
                format!("👤 Кто кормит: {initiator}"),
                format!("📅 Дата: {}", started_at.format(DATE_FORMAT)),
                format!("⏱️ Начало: {}", started_at.format(TIME_FORMAT)),
            ];
            if let Some(ml) = prepared_ml {
                lines.push(format!("🍶 Приготовлено: {ml} мл"));
            }
            lines.push("🛑 Конец: в процессе...".to_string());
            lines.join("\n")
        }
        View::Completed(done) => render_completed(done),
        View::Cancelled => "❌ Кормление отменено".to_string(),
        View::Prompt(PromptKind::Prepared) => "Сколько мл приготовлено?".to_string(),
        View::Prompt(PromptKind::Eaten) => "Сколько мл съедено?".to_string(),
    }
}

fn render_completed(done: &CompletedFeeding) -> String {
    let prepared = match done.prepared_ml {
        Some(ml) => format!("{ml} мл"),
        None => "не указано".to_string(),
    };
    [
        "✅ Кормление завершено!".to_string(),
        format!("👤 Кто кормил: {}", done.initiator.display_name),
        format!("👤 Завершил: {}", done.finisher.display_name),
        format!("📅 Дата: {}", done.started_at.format(DATE_FORMAT)),
        format!("⏱️ Начало: {}", done.started_at.format(TIME_FORMAT)),
        format!("⏱️ Конец: {}", done.ended_at.format(TIME_FORMAT)),
        format!("⏳ Длительность: {} мин", done.duration_minutes()),
        format!("🍶 Приготовлено: {prepared}"),
        format!("🍴 Съедено: {} мл", done.eaten_ml),
    ]
    .join("\n")
}

/// What the actor is told when an event is refused.
pub fn error_text(err: &FeedingError) -> &'static str {
    match err {
        FeedingError::AlreadyActive => "❌ Уже есть активное кормление! Сначала завершите его.",
        FeedingError::NoActiveSession => "❌ Нет активного кормления!",
        FeedingError::PermissionDenied(Action::Finish) => {
            "⚠️ Только инициатор или администратор может завершить кормление!"
        }
        FeedingError::PermissionDenied(Action::Cancel) => {
            "⚠️ Только инициатор или администратор может отменить кормление!"
        }
        FeedingError::InvalidInput => {
            "Пожалуйста, введите корректное положительное число (например: 150)"
        }
        FeedingError::Delivery => "⚠️ Не удалось начать кормление, попробуйте ещё раз",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset, TimeZone};
    use feeding_core::{Actor, ChatId, MessageId, UserId};

    fn at(h: u32, m: u32, s: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 2, 9, h, m, s)
            .unwrap()
    }

    fn completed(prepared_ml: Option<u32>) -> CompletedFeeding {
        CompletedFeeding {
            chat_id: ChatId(1),
            anchor: MessageId(2),
            initiator: Actor::new(UserId(1), "Anna Petrova"),
            finisher: Actor::new(UserId(2), "Boris"),
            started_at: at(9, 5, 0),
            ended_at: at(9, 47, 59),
            prepared_ml,
            eaten_ml: 80,
        }
    }

    #[test]
    fn started_card_without_volume() {
        let text = render(&View::Started {
            initiator: "Anna".into(),
            started_at: at(9, 5, 0),
            prepared_ml: None,
        });
        assert_eq!(
            text,
            "🍼 Кормление начато!\n👤 Кто кормит: Anna\n📅 Дата: 09.02.2024\n⏱️ Начало: 09:05\n🛑 Конец: в процессе..."
        );
    }

    #[test]
    fn started_card_with_volume() {
        let text = render(&View::Started {
            initiator: "Anna".into(),
            started_at: at(9, 5, 0),
            prepared_ml: Some(150),
        });
        assert!(text.contains("\n🍶 Приготовлено: 150 мл\n🛑 Конец"));
    }

    #[test]
    fn completed_card() {
        let text = render(&View::Completed(completed(Some(120))));
        assert!(text.starts_with("✅ Кормление завершено!"));
        assert!(text.contains("👤 Кто кормил: Anna Petrova"));
        assert!(text.contains("👤 Завершил: Boris"));
        assert!(text.contains("⏱️ Начало: 09:05"));
        assert!(text.contains("⏱️ Конец: 09:47"));
        assert!(text.contains("⏳ Длительность: 42 мин"));
        assert!(text.contains("🍶 Приготовлено: 120 мл"));
        assert!(text.ends_with("🍴 Съедено: 80 мл"));
    }

    #[test]
    fn completed_card_marks_missing_prepared_volume() {
        let text = render(&View::Completed(completed(None)));
        assert!(text.contains("🍶 Приготовлено: не указано\n"));
        assert!(!text.contains("Приготовлено: 0"));
    }

    #[test]
    fn prompts_and_help() {
        assert_eq!(render(&View::Prompt(PromptKind::Prepared)), "Сколько мл приготовлено?");
        assert_eq!(render(&View::Prompt(PromptKind::Eaten)), "Сколько мл съедено?");
        assert!(render(&View::Help).contains("/end_feeding - Завершить кормление"));
    }

    #[test]
    fn keyboards() {
        let markup = reply_markup(Keyboard::FinishOrCancel);
        let row = &markup["inline_keyboard"][0];
        assert_eq!(row[0]["callback_data"], FINISH_FEEDING);
        assert_eq!(row[1]["callback_data"], CANCEL_FEEDING);

        let markup = reply_markup(Keyboard::Start);
        assert_eq!(markup["inline_keyboard"][0][0]["callback_data"], START_FEEDING);
        assert_eq!(markup["inline_keyboard"][0][0]["text"], "🍼 Начать кормление");
    }

    #[test]
    fn permission_texts_name_the_action() {
        assert!(error_text(&FeedingError::PermissionDenied(Action::Finish)).contains("завершить"));
        assert!(error_text(&FeedingError::PermissionDenied(Action::Cancel)).contains("отменить"));
    }
}
