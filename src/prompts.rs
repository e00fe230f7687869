//! Prompts for LLM-based metadata extraction.
//!
//! Every prompt string lives here so unit tests can inspect it without
//! calling a model.

/// System persona sent as the first chat message.
pub const EXTRACTOR_PERSONA: &str = "You are a document information extractor.";

/// The fields the model is asked to fill, in the order it must emit them.
pub const METADATA_FIELDS: [&str; 14] = [
    "ProductID",
    "Name",
    "ProductNumber",
    "MakeFlag",
    "FinishedGoodsFlag",
    "Color",
    "StandardCost",
    "ListPrice",
    "Size",
    "ProductLine",
    "Class",
    "Style",
    "ProductSubcategoryID",
    "ProductModelID",
];

/// Build the user prompt for `text`.
///
/// The document text is appended verbatim after the instructions. It is not
/// truncated, so very long documents may exceed the model's context window.
pub fn extraction_prompt(text: &str) -> String {
    let template = METADATA_FIELDS
        .iter()
        .map(|field| format!("  \"{field}\": \"\""))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "Extract the following fields from the text in the exact order below, and respond \
strictly in JSON format without extra text or explanation:\n\n\
{{\n{template}\n}}\n\n\
If any field is missing in the text, return an empty string (\"\") for that field. \
Do not include any explanations, comments, or additional text.\n\n\
Text:\n{text}"
    )
}
