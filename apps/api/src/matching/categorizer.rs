//! Categorizer — assigns each vacancy item to a scoring category by keyword membership.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::matching::models::ScoreCategory;

const TECHNICAL_SKILLS: &[&str] = &[
    "настройка", "оборудование", "сервер", "сеть", "raid", "массив дисков",
    "восстановление дисков", "bmc", "bios", "python", "sql", "cisco", "mikrotik", "ssh",
    "ubuntu", "windows server", "скрипт", "кабель", "монтаж", "демонтаж", "техобслуживание",
    "сборка", "диагностика", "инцидент", "подключение", "схд", "коммутатор", "firewall", "пк",
    "сетевое", "linux", "windows", "api", "cli", "bash", "powershell", "html", "css", "rest",
    "graphql", "docker", "kubernetes", "базы данных", "orm", "json", "xml",
    "отказоустойчивость", "резервирование", "восстановление", "логи", "мониторинг",
    "отказ диска", "javascript", "js", "typescript", "react", "vue", "angular", "фронтенд",
    "spa", "верстка", "redux", "node.js", "django", "flask", "spring", "backend", "бэкенд",
    "микросервисы", "java", "c#", "go", "devops", "ansible", "terraform", "jenkins", "ci/cd",
    "k8s", "aws", "azure", "gcp", "nginx", "бизнес-аналитик", "риск-менеджер", "fraud",
    "антифрод", "кредитный аналитик", "scoring", "системный аналитик", "специалист цод", "цод",
    "дата-центр", "rack", "х86", "dcim",
];

const COMMUNICATION_SKILLS: &[&str] = &[
    "речь", "коммуникация", "обучение", "консультация", "взаимодействие", "координация",
    "общение", "отчет", "подготовка отчетов", "сопровождение", "клиент", "консультирование",
    "презентация", "переговоры", "деловая переписка", "грамотный", "объяснил", "договорился",
];

const CASE_PROJECTS: &[&str] = &[
    "проект", "внедрение", "разработка", "тест", "анализ", "оптимизация", "реализация",
    "автоматизация", "восстановительные работы", "mvp", "релиз", "интеграция", "улучшил",
    "сократил", "увеличил", "добился", "результат", "метрика", "kpi", "экономия",
];

/// Keyword lists per category. Loaded once at startup, injected into `Categorizer`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategoryKeywords {
    pub technical_skills: Vec<String>,
    pub communication_skills: Vec<String>,
    pub case_projects: Vec<String>,
}

impl Default for CategoryKeywords {
    fn default() -> Self {
        let owned = |words: &[&str]| -> Vec<String> { words.iter().map(|w| w.to_string()).collect() };
        Self {
            technical_skills: owned(TECHNICAL_SKILLS),
            communication_skills: owned(COMMUNICATION_SKILLS),
            case_projects: owned(CASE_PROJECTS),
        }
    }
}

impl CategoryKeywords {
    /// Reads a JSON document with the three keyword arrays.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read category keywords from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid category keywords JSON in {}", path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct Categorizer {
    /// Priority order matters: the first list with a hit wins.
    lists: Vec<(ScoreCategory, Vec<String>)>,
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new(CategoryKeywords::default())
    }
}

impl Categorizer {
    pub fn new(keywords: CategoryKeywords) -> Self {
        let lower = |words: Vec<String>| -> Vec<String> {
            words
                .into_iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect()
        };
        Self {
            lists: vec![
                (ScoreCategory::TechnicalSkills, lower(keywords.technical_skills)),
                (
                    ScoreCategory::CommunicationSkills,
                    lower(keywords.communication_skills),
                ),
                (ScoreCategory::CaseProjects, lower(keywords.case_projects)),
            ],
        }
    }

    /// Substring match on the lowercased item; no hit → `experience_relevance`.
    pub fn categorize(&self, item_text: &str) -> ScoreCategory {
        let item_lower = item_text.to_lowercase();
        self.lists
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| item_lower.contains(kw.as_str())))
            .map(|(category, _)| *category)
            .unwrap_or(ScoreCategory::ExperienceRelevance)
    }
}
