use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to parse JSON: {0}")]
    Json(String),

    #[error("malformed layout{}: {message}", location(.row, .element))]
    MalformedInput {
        /// Row index, counted after the header element.
        row: Option<usize>,
        element: Option<usize>,
        message: String,
    },
}

impl Error {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput {
            row: None,
            element: None,
            message: message.into(),
        }
    }

    pub(crate) fn at_row(row: usize, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            row: Some(row),
            element: None,
            message: message.into(),
        }
    }

    pub(crate) fn at_element(row: usize, element: usize, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            row: Some(row),
            element: Some(element),
            message: message.into(),
        }
    }
}

fn location(row: &Option<usize>, element: &Option<usize>) -> String {
    match (row, element) {
        (Some(r), Some(e)) => format!(" at row {r}, element {e}"),
        (Some(r), None) => format!(" at row {r}"),
        _ => String::new(),
    }
}
