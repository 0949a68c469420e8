use crate::data::Data;

/// The externally visible outcome of evaluating one line of the document.
///
/// `summarized_result_data` is `None` when no statement matched the line, or when the
/// matched statement produces no value (comments, headers). `display_text` is the
/// culture-formatted rendering of the data, empty when there is none.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserAndInterpreterResultLine {
    pub line_index: usize,
    pub summarized_result_data: Option<Data>,
    pub display_text: String,
}

/// Shorter name used throughout the pipeline.
pub type ResultLine = ParserAndInterpreterResultLine;

impl ParserAndInterpreterResultLine {
    pub fn empty(line_index: usize) -> Self {
        Self {
            line_index,
            summarized_result_data: None,
            display_text: String::new(),
        }
    }

    pub fn has_result(&self) -> bool {
        self.summarized_result_data.is_some()
    }
}
