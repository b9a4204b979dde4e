use serde::Deserialize;

/// Footprint reference designators, generated page by page: `K101..K116, K201, ...`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReferenceScheme {
    pub prefix: String,
    pub pages: u32,
    pub per_page: u32,
}

impl Default for ReferenceScheme {
    fn default() -> Self {
        Self {
            prefix: "K".to_string(),
            pages: 4,
            per_page: 16,
        }
    }
}

impl ReferenceScheme {
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages as usize * self.per_page as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Digits used for the in-page number: at least two, more once `per_page` exceeds 99.
    #[must_use]
    pub fn number_width(&self) -> usize {
        self.per_page.to_string().len().max(2)
    }

    /// `{prefix}{page}{num}` with `num` zero-padded to [`Self::number_width`]. The fixed width
    /// keeps names unique across pages.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let width = self.number_width();
        (1..=self.pages)
            .flat_map(|page| {
                (1..=self.per_page)
                    .map(move |num| format!("{}{page}{num:0width$}", self.prefix))
            })
            .collect()
    }
}
