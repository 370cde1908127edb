use chrono::{Datelike, NaiveDate, Weekday};
use sys_locale::get_locale;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Ru,
    En,
}

pub struct Labels {
    pub overdue: &'static str,
    pub today: &'static str,
    pub tomorrow: &'static str,
    pub no_date: &'static str,
    pub done_title: &'static str,
    pub error_title: &'static str,
    pub task_created: &'static str,
    pub task_updated: &'static str,
    pub task_deleted: &'static str,
    pub create_failed: &'static str,
    pub update_failed: &'static str,
    pub delete_failed: &'static str,
    pub status_failed: &'static str,
    pub reorder_failed: &'static str,
    pub network_problem: &'static str,
}

/// `auto` (or anything unrecognized) falls back to the system locale.
pub fn resolve_language(language: &str) -> Language {
    let normalized = language.trim().to_lowercase();
    match normalized.as_str() {
        "ru" => Language::Ru,
        "en" => Language::En,
        _ => detect_system_language(),
    }
}

fn detect_system_language() -> Language {
    let locale = get_locale().unwrap_or_default().to_lowercase();
    language_from_locale(&locale)
}

fn language_from_locale(locale: &str) -> Language {
    if locale.starts_with("ru") {
        Language::Ru
    } else {
        Language::En
    }
}

pub fn labels(lang: Language) -> Labels {
    match lang {
        Language::Ru => Labels {
            overdue: "Просрочено",
            today: "Сегодня",
            tomorrow: "Завтра",
            no_date: "Без даты",
            done_title: "Готово",
            error_title: "Ошибка",
            task_created: "Задача создана",
            task_updated: "Задача обновлена",
            task_deleted: "Задача удалена",
            create_failed: "Не удалось создать задачу",
            update_failed: "Не удалось обновить задачу",
            delete_failed: "Не удалось удалить задачу",
            status_failed: "Не удалось изменить статус",
            reorder_failed: "Не удалось сохранить порядок",
            network_problem: "Проблема с сетью",
        },
        Language::En => Labels {
            overdue: "Overdue",
            today: "Today",
            tomorrow: "Tomorrow",
            no_date: "No date",
            done_title: "Done",
            error_title: "Error",
            task_created: "Task created",
            task_updated: "Task updated",
            task_deleted: "Task deleted",
            create_failed: "Could not create the task",
            update_failed: "Could not update the task",
            delete_failed: "Could not delete the task",
            status_failed: "Could not change the status",
            reorder_failed: "Could not save the new order",
            network_problem: "Network problem",
        },
    }
}

fn weekday_name(lang: Language, weekday: Weekday) -> &'static str {
    match (lang, weekday) {
        (Language::Ru, Weekday::Mon) => "Понедельник",
        (Language::Ru, Weekday::Tue) => "Вторник",
        (Language::Ru, Weekday::Wed) => "Среда",
        (Language::Ru, Weekday::Thu) => "Четверг",
        (Language::Ru, Weekday::Fri) => "Пятница",
        (Language::Ru, Weekday::Sat) => "Суббота",
        (Language::Ru, Weekday::Sun) => "Воскресенье",
        (Language::En, Weekday::Mon) => "Monday",
        (Language::En, Weekday::Tue) => "Tuesday",
        (Language::En, Weekday::Wed) => "Wednesday",
        (Language::En, Weekday::Thu) => "Thursday",
        (Language::En, Weekday::Fri) => "Friday",
        (Language::En, Weekday::Sat) => "Saturday",
        (Language::En, Weekday::Sun) => "Sunday",
    }
}

/// Heading for a dated bucket, e.g. `Wednesday, 21.10`. The year is shown only when it
/// differs from `current_year`.
pub fn day_label(lang: Language, date: NaiveDate, current_year: i32) -> String {
    let weekday = weekday_name(lang, date.weekday());
    if date.year() == current_year {
        format!("{weekday}, {}", date.format("%d.%m"))
    } else {
        format!("{weekday}, {}", date.format("%d.%m.%Y"))
    }
}
