//! Localization overlay for template field labels.
//!
//! Catalog content carries field labels in whatever language it was authored
//! in. Before templates reach the UI, labels are rewritten to canonical
//! strings for the requested language. First match wins:
//!
//! 1. Section fields (`market`, `vitamins`, `checklist`) always get the
//!    section title, whatever the template type.
//! 2. `text` fields get the canonical question for the template's normalized
//!    type, when one is known.
//! 3. Labels that exactly match known legacy wording are mapped to their
//!    canonical key. This covers content authored before translation keys
//!    existed in the catalog.
//!
//! Anything else is left as authored.

use tracing::debug;

use crate::models::{Field, FieldType, Language, Template};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LabelKey {
    MarketSection,
    VitaminsSection,
    ChecklistSection,
    BirthdayQuestion,
    StudyQuestion,
    BookQuestion,
    CallQuestion,
    SkincareQuestion,
    WaterQuestion,
    OrganizeSpacesQuestion,
    MeditationQuestion,
    WorkoutQuestion,
}

impl LabelKey {
    const ALL: [LabelKey; 12] = [
        LabelKey::MarketSection,
        LabelKey::VitaminsSection,
        LabelKey::ChecklistSection,
        LabelKey::BirthdayQuestion,
        LabelKey::StudyQuestion,
        LabelKey::BookQuestion,
        LabelKey::CallQuestion,
        LabelKey::SkincareQuestion,
        LabelKey::WaterQuestion,
        LabelKey::OrganizeSpacesQuestion,
        LabelKey::MeditationQuestion,
        LabelKey::WorkoutQuestion,
    ];

    fn text(self, language: Language) -> &'static str {
        use Language::*;
        use LabelKey::*;
        match (self, language) {
            (MarketSection, En) => "Shopping list",
            (MarketSection, Ru) => "Список покупок",
            (MarketSection, Es) => "Lista de compras",
            (VitaminsSection, En) => "Vitamins",
            (VitaminsSection, Ru) => "Витамины",
            (VitaminsSection, Es) => "Vitaminas",
            (ChecklistSection, En) => "Checklist",
            (ChecklistSection, Ru) => "Чек-лист",
            (ChecklistSection, Es) => "Lista de tareas",
            (BirthdayQuestion, En) => "Whose birthday is it?",
            (BirthdayQuestion, Ru) => "Чей день рождения?",
            (BirthdayQuestion, Es) => "¿De quién es el cumpleaños?",
            (StudyQuestion, En) => "What are you studying?",
            (StudyQuestion, Ru) => "Что вы изучаете?",
            (StudyQuestion, Es) => "¿Qué estás estudiando?",
            (BookQuestion, En) => "Which book are you reading?",
            (BookQuestion, Ru) => "Какую книгу вы читаете?",
            (BookQuestion, Es) => "¿Qué libro estás leyendo?",
            (CallQuestion, En) => "Who do you want to call?",
            (CallQuestion, Ru) => "Кому вы хотите позвонить?",
            (CallQuestion, Es) => "¿A quién quieres llamar?",
            (SkincareQuestion, En) => "Which products do you use?",
            (SkincareQuestion, Ru) => "Какие средства вы используете?",
            (SkincareQuestion, Es) => "¿Qué productos usas?",
            (WaterQuestion, En) => "How much water did you drink?",
            (WaterQuestion, Ru) => "Сколько воды вы выпили?",
            (WaterQuestion, Es) => "¿Cuánta agua bebiste?",
            (OrganizeSpacesQuestion, En) => "Which space will you organize?",
            (OrganizeSpacesQuestion, Ru) => "Какое пространство вы организуете?",
            (OrganizeSpacesQuestion, Es) => "¿Qué espacio vas a organizar?",
            (MeditationQuestion, En) => "How long did you meditate?",
            (MeditationQuestion, Ru) => "Сколько минут вы медитировали?",
            (MeditationQuestion, Es) => "¿Cuánto tiempo meditaste?",
            (WorkoutQuestion, En) => "What workout did you do?",
            (WorkoutQuestion, Ru) => "Какую тренировку вы сделали?",
            (WorkoutQuestion, Es) => "¿Qué entrenamiento hiciste?",
        }
    }
}

/// Canonical form of a free-form template type.
///
/// Lowercases and strips whitespace, underscores and hyphens, so
/// `"Organize Spaces"`, `"organize_spaces"` and `"organize-spaces"` compare equal.
pub fn normalize_type(template_type: &str) -> String {
    template_type
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn section_key(field_type: FieldType) -> Option<LabelKey> {
    match field_type {
        FieldType::Market => Some(LabelKey::MarketSection),
        FieldType::Vitamins => Some(LabelKey::VitaminsSection),
        FieldType::Checklist => Some(LabelKey::ChecklistSection),
        FieldType::Text | FieldType::Number => None,
    }
}

fn question_key(normalized_type: &str) -> Option<LabelKey> {
    match normalized_type {
        "birthday" | "birthdays" => Some(LabelKey::BirthdayQuestion),
        "study" | "learn" | "learning" => Some(LabelKey::StudyQuestion),
        "book" | "reading" | "readbook" => Some(LabelKey::BookQuestion),
        "call" | "callfamily" | "callfriend" => Some(LabelKey::CallQuestion),
        "skincare" => Some(LabelKey::SkincareQuestion),
        "water" | "drinkwater" => Some(LabelKey::WaterQuestion),
        "organizespaces" | "organize" | "declutter" => Some(LabelKey::OrganizeSpacesQuestion),
        "meditation" | "meditate" => Some(LabelKey::MeditationQuestion),
        "workout" | "exercise" | "sport" => Some(LabelKey::WorkoutQuestion),
        _ => None,
    }
}

// TODO: drop once every catalog field carries a translation key.
fn legacy_key(label: &str) -> Option<LabelKey> {
    let key = match label {
        "Что купить?" | "Покупки" | "What to buy?" | "Shopping" => LabelKey::MarketSection,
        "Какие витамины?" | "Which vitamins?" => LabelKey::VitaminsSection,
        "Список дел" | "To-do list" | "Tasks" => LabelKey::ChecklistSection,
        "Чей день рождения" | "Имя именинника" | "Whose birthday?" | "Birthday person" => {
            LabelKey::BirthdayQuestion
        }
        "Что изучаете?" | "Предмет" | "Subject" | "What do you study?" => LabelKey::StudyQuestion,
        "Название книги" | "Какую книгу читаете?" | "Book title" | "Book name" => LabelKey::BookQuestion,
        "Кому позвонить?" | "Кому звонить" | "Who to call?" | "Contact name" => LabelKey::CallQuestion,
        "Какие средства?" | "Products" => LabelKey::SkincareQuestion,
        "Сколько стаканов?" | "Glasses of water" => LabelKey::WaterQuestion,
        "Какое место?" | "Which area?" => LabelKey::OrganizeSpacesQuestion,
        "Минут медитации" | "Meditation minutes" => LabelKey::MeditationQuestion,
        "Какая тренировка?" | "Workout type" => LabelKey::WorkoutQuestion,
        _ => return canonical_key(label),
    };
    Some(key)
}

/// Labels already in canonical form, in any language.
fn canonical_key(label: &str) -> Option<LabelKey> {
    LabelKey::ALL
        .into_iter()
        .find(|key| Language::ALL.iter().any(|lang| key.text(*lang) == label))
}

fn localize_field(field: &mut Field, template_type: &str, normalized_type: &str, language: Language) {
    let key = section_key(field.field_type)
        .or_else(|| match field.field_type {
            FieldType::Text => question_key(normalized_type),
            _ => None,
        })
        .or_else(|| legacy_key(&field.label));

    match key {
        Some(key) => {
            let text = key.text(language);
            if field.label != text {
                field.label = text.to_string();
            }
        }
        None => {
            debug!(
                template_type = template_type,
                field = %field.key,
                label = %field.label,
                lang = %language,
                "No localization for field label, leaving as authored"
            );
        }
    }
}

/// Rewrite field labels of one template for `language`.
pub fn localize_template(mut template: Template, language: Language) -> Template {
    let normalized = normalize_type(&template.template_type);
    if let Some(config) = template.config.as_mut() {
        for field in config.fields.iter_mut() {
            localize_field(field, &template.template_type, &normalized, language);
        }
    }
    template
}

/// Rewrite field labels of every template for `language`.
pub fn localize(templates: Vec<Template>, language: Language) -> Vec<Template> {
    templates
        .into_iter()
        .map(|t| localize_template(t, language))
        .collect()
}
