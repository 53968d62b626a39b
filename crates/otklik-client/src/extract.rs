//! Listing-page extraction via a cascade of CSS selectors.
//!
//! Markup on the search pages changes between frontend releases, so card
//! detection tries several selector generations in order and uses the first
//! one that yields entries. Extraction never fails; an unrecognized page
//! yields an empty list and counts as feed exhaustion upstream.

use otklik_core::models::Vacancy;
use otklik_core::traits::VacancyExtractor;
use scraper::{ElementRef, Html, Selector};

const CARD_SELECTORS: &[&str] = &[
    r#"[data-qa="vacancy-serp__vacancy"]"#,
    ".vacancy-serp-item",
];

const TITLE_SELECTORS: &[&str] = &[
    r#"a[data-qa="serp-item__title"]"#,
    r#"a[data-qa="vacancy-serp__vacancy-title"]"#,
];

const COMPANY_SELECTORS: &[&str] = &[
    r#"[data-qa="vacancy-serp__vacancy-employer"]"#,
    ".vacancy-serp-item__meta-info-company",
];

const SALARY_SELECTORS: &[&str] = &[
    r#"[data-qa="vacancy-serp__vacancy-compensation"]"#,
    ".vacancy-serp-item__compensation",
];

const SNIPPET_SELECTORS: &[&str] = &[
    r#"[data-qa="vacancy-serp__vacancy_snippet_responsibility"]"#,
    ".vacancy-serp-item__info",
];

/// Extractor over the selector cascades above.
#[derive(Clone)]
pub struct SelectorExtractor {
    cards: Vec<Selector>,
    titles: Vec<Selector>,
    companies: Vec<Selector>,
    salaries: Vec<Selector>,
    snippets: Vec<Selector>,
}

impl SelectorExtractor {
    pub fn new() -> Self {
        Self {
            cards: parse_all(CARD_SELECTORS),
            titles: parse_all(TITLE_SELECTORS),
            companies: parse_all(COMPANY_SELECTORS),
            salaries: parse_all(SALARY_SELECTORS),
            snippets: parse_all(SNIPPET_SELECTORS),
        }
    }

    fn vacancy_from_card(&self, card: ElementRef<'_>) -> Option<Vacancy> {
        let title_el = first_match(card, &self.titles)?;
        let href = title_el.value().attr("href")?;
        let id = vacancy_id(href)?;

        let title = element_text(title_el);
        if title.is_empty() {
            return None;
        }

        Some(Vacancy {
            id,
            title,
            company: first_match(card, &self.companies)
                .map(element_text)
                .unwrap_or_default(),
            salary_text: first_match(card, &self.salaries)
                .map(element_text)
                .filter(|s| !s.is_empty()),
            snippet: first_match(card, &self.snippets)
                .map(element_text)
                .unwrap_or_default(),
        })
    }
}

impl Default for SelectorExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl VacancyExtractor for SelectorExtractor {
    fn extract(&self, page_content: &str) -> Vec<Vacancy> {
        let document = Html::parse_document(page_content);

        for card_selector in &self.cards {
            let vacancies: Vec<Vacancy> = document
                .select(card_selector)
                .filter_map(|card| self.vacancy_from_card(card))
                .collect();
            if !vacancies.is_empty() {
                return vacancies;
            }
        }

        // Last resort: bare title anchors without a recognizable card wrapper.
        for title_selector in &self.titles {
            let vacancies: Vec<Vacancy> = document
                .select(title_selector)
                .filter_map(|anchor| {
                    let href = anchor.value().attr("href")?;
                    let id = vacancy_id(href)?;
                    let title = element_text(anchor);
                    if title.is_empty() {
                        return None;
                    }
                    Some(Vacancy {
                        id,
                        title,
                        company: String::new(),
                        salary_text: None,
                        snippet: String::new(),
                    })
                })
                .collect();
            if !vacancies.is_empty() {
                tracing::debug!(
                    count = vacancies.len(),
                    "No card wrapper matched, extracted bare title anchors"
                );
                return vacancies;
            }
        }

        Vec::new()
    }
}

fn parse_all(selectors: &[&str]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
}

fn first_match<'a>(card: ElementRef<'a>, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|s| card.select(s).next())
}

fn element_text(el: ElementRef<'_>) -> String {
    let joined = el.text().collect::<Vec<_>>().join(" ");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pull the numeric vacancy id out of an href like `/vacancy/12345?query=...`.
fn vacancy_id(href: &str) -> Option<String> {
    let rest = &href[href.find("vacancy/")? + "vacancy/".len()..];
    let id: String = rest.chars().take_while(char::is_ascii_digit).collect();
    if id.is_empty() { None } else { Some(id) }
}
