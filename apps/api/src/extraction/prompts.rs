//! LLM prompt constants for document extraction.
//!
//! Every prompt asks for JSON only. Callers deserialize via `llm.call_json::<T>()`
//! and then pass the result through the contract helpers in `extraction`.

// ────────────────────────────────────────────────────────────────────────────
// Identity document → default fields
// ────────────────────────────────────────────────────────────────────────────

pub const EXTRACT_DEFAULT_SYSTEM: &str = "\
You are an expert data extraction specialist working on identity documents.\n\
\n\
Respond with valid JSON only.\n\
Do NOT use markdown code fences. Do NOT add any explanation outside the JSON object.";

pub const EXTRACT_DEFAULT_PROMPT: &str = "\
Extract the following information from the attached document, if present.\n\
Return a JSON object with these keys:\n\
- name: the person's full name\n\
- dob: the date of birth in YYYY-MM-DD format\n\
- gender: the gender\n\
- address: the address as a single string\n\
- aadhaar: the Aadhaar number\n\
- pan: the PAN number\n\
\n\
If a piece of information is not present in the document, omit that key.\n\
{no_invention}";

// ────────────────────────────────────────────────────────────────────────────
// Document text → default fields
// ────────────────────────────────────────────────────────────────────────────

pub const PREFILL_TEXT_PROMPT: &str = "\
The text below was extracted from an identity document.\n\
Extract: name, date of birth (YYYY-MM-DD), gender, address (single string), \
Aadhaar number, PAN number.\n\
\n\
Return a JSON object with the keys name, dob, gender, address, aadhaar, pan. \
If a value cannot be extracted, leave it as an empty string.\n\
{no_invention}\n\
\n\
DOCUMENT TEXT:\n\
{document_text}";

// ────────────────────────────────────────────────────────────────────────────
// Blank form → schema
// ────────────────────────────────────────────────────────────────────────────

pub const EXTRACT_SCHEMA_SYSTEM: &str = "\
You analyse blank forms and describe the fields a person must fill in.\n\
\n\
Respond with valid JSON only: {\"fields\": [{\"name\": \"...\", \"type\": \"...\"}]}\n\
Do NOT use markdown code fences. Do NOT add any explanation outside the JSON object.";

pub const EXTRACT_SCHEMA_PROMPT: &str = "\
List every fillable field of the attached blank form, in the order a reader meets them \
(top to bottom, left to right).\n\
\n\
For each field return:\n\
- name: the field's label as printed on the form\n\
- type: one of \"text\", \"date\", \"checkbox\", \"photo\"\n\
\n\
Use \"photo\" for boxes meant for a pasted photograph, \"checkbox\" for tick boxes, \
\"date\" for any date. Everything else is \"text\". Do not list the same field twice.\n\
\n\
Return JSON only: {\"fields\": [...]}";

// ────────────────────────────────────────────────────────────────────────────
// Source document + field list → mapped values
// ────────────────────────────────────────────────────────────────────────────

pub const MAP_DOCUMENT_SYSTEM: &str = "\
You are an assistant that fills out forms from source documents.\n\
\n\
Respond with valid JSON only: {\"entries\": [{\"fieldName\": \"...\", \"extractedValue\": \"...\"}]}\n\
Do NOT use markdown code fences. Do NOT add any explanation outside the JSON object.";

pub const MAP_DOCUMENT_PROMPT: &str = "\
These are the fields of the form that must be filled:\n\
{field_list}\n\
\n\
Analyse the attached source document and extract the value for each field above.\n\
\n\
Return a JSON object with an \"entries\" array. Each entry has:\n\
- fieldName: the exact field name from the list\n\
- extractedValue: the value found in the document\n\
\n\
If you cannot find a value for a field, set extractedValue to \"\". Do not omit any field.\n\
{no_invention}";
