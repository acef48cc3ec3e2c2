use super::{PageFetcher, Scrape};
use crate::types::FormField;
use crate::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// The application form fields found on a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormScrape {
    pub url: String,
    pub form_fields: BTreeMap<String, FormField>,
}

/// The `FormScraper` struct collects the inputs of every form on a page.
pub struct FormScraper {
    fetcher: PageFetcher,
}

impl FormScraper {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Scrape for FormScraper {
    type Output = FormScrape;

    #[instrument(skip(self))]
    async fn scrape(&self, url: &str) -> Result<FormScrape> {
        let page = self.fetcher.fetch(url).await?;
        let form_fields = extract_form_fields(&Html::parse_document(&page.content));
        debug!("Found {} form fields on {}", form_fields.len(), page.url);

        Ok(FormScrape {
            url: url.to_string(),
            form_fields,
        })
    }
}

/// Extracts the `input`, `select` and `textarea` elements of every form, keyed by `name` or `id`.
///
/// Later fields with the same key replace earlier ones.
pub fn extract_form_fields(document: &Html) -> BTreeMap<String, FormField> {
    let mut fields = BTreeMap::new();

    let (Ok(forms), Ok(inputs), Ok(options)) = (
        Selector::parse("form"),
        Selector::parse("input, select, textarea"),
        Selector::parse("option"),
    ) else {
        return fields;
    };

    for form in document.select(&forms) {
        for field in form.select(&inputs) {
            let element = field.value();
            let Some(key) = element.attr("name").or_else(|| element.attr("id")) else {
                continue;
            };

            let is_select = element.name() == "select";
            let field_type = match element.name() {
                "input" => element.attr("type").unwrap_or("text"),
                other => other,
            };

            fields.insert(
                key.to_string(),
                FormField {
                    field_type: field_type.to_string(),
                    required: element.attr("required").is_some(),
                    placeholder: element.attr("placeholder").unwrap_or_default().to_string(),
                    options: is_select.then(|| {
                        field
                            .select(&options)
                            .filter_map(|option| option.value().attr("value"))
                            .map(str::to_string)
                            .collect()
                    }),
                },
            );
        }
    }

    fields
}
