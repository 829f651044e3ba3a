//! Validation rules for seller billing details
//!
//! The rules are data tables rather than nested conditionals: a required-field
//! table, a country-conditional table, and the country code length check.
//! Jurisdiction-specific requirements extend `COUNTRY_RULES` without new
//! branching logic.

use crate::models::BillingDetailInput;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field identifier, matching the input field name
    pub field: &'static str,
    /// Complete human-readable message, e.g. "Full name can't be blank"
    pub message: String,
}

type FieldAccessor = for<'a> fn(&'a BillingDetailInput) -> Option<&'a str>;

/// A field participating in required / conditionally-required checks
struct FieldSpec {
    field: &'static str,
    label: &'static str,
    value: FieldAccessor,
}

/// Fields that must be non-blank on every submission, in reporting order
const REQUIRED_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        field: "full_name",
        label: "Full name",
        value: |input: &BillingDetailInput| input.full_name.as_deref(),
    },
    FieldSpec {
        field: "street_address",
        label: "Street address",
        value: |input: &BillingDetailInput| input.street_address.as_deref(),
    },
    FieldSpec {
        field: "city",
        label: "City",
        value: |input: &BillingDetailInput| input.city.as_deref(),
    },
    FieldSpec {
        field: "zip_code",
        label: "Zip code",
        value: |input: &BillingDetailInput| input.zip_code.as_deref(),
    },
    FieldSpec {
        field: "country_code",
        label: "Country code",
        value: |input: &BillingDetailInput| input.country_code.as_deref(),
    },
];

/// A country-conditional requirement: when `applies` matches the submitted
/// country code, the listed fields must also be non-blank
struct CountryRule {
    applies: fn(&str) -> bool,
    required: &'static [FieldSpec],
}

const COUNTRY_RULES: &[CountryRule] = &[
    // US addresses must carry a state
    CountryRule {
        applies: |code| code == "US",
        required: &[FieldSpec {
            field: "state",
            label: "State",
            value: |input: &BillingDetailInput| input.state.as_deref(),
        }],
    },
];

/// Required length of the country code (ISO-3166 alpha-2)
const COUNTRY_CODE_LENGTH: usize = 2;

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

fn blank_error(spec: &FieldSpec) -> FieldError {
    FieldError {
        field: spec.field,
        message: format!("{} can't be blank", spec.label),
    }
}

/// Validate a billing detail field set
///
/// Returns the field errors in reporting order; an empty list means the field
/// set may be committed. The checks are independent: the country code length
/// check runs regardless of the blankness check, so a blank country code
/// reports both errors.
pub fn validate_billing_detail(input: &BillingDetailInput) -> Vec<FieldError> {
    let mut errors = Vec::new();

    for spec in REQUIRED_FIELDS {
        if is_blank((spec.value)(input)) {
            errors.push(blank_error(spec));
        }
    }

    let country_code = input.country_code.as_deref().unwrap_or("");
    for rule in COUNTRY_RULES {
        if (rule.applies)(country_code) {
            for spec in rule.required {
                if is_blank((spec.value)(input)) {
                    errors.push(blank_error(spec));
                }
            }
        }
    }

    if country_code.chars().count() != COUNTRY_CODE_LENGTH {
        errors.push(FieldError {
            field: "country_code",
            message: format!(
                "Country code is the wrong length (should be {} characters)",
                COUNTRY_CODE_LENGTH
            ),
        });
    }

    errors
}

/// Whether the state field is required for the given country code
///
/// The settings form uses this to decide when to show the state selector; it
/// reads the same rule table as `validate_billing_detail`, so form visibility
/// cannot drift from the validation rule.
pub fn is_state_required(country_code: &str) -> bool {
    COUNTRY_RULES.iter().any(|rule| {
        (rule.applies)(country_code) && rule.required.iter().any(|spec| spec.field == "state")
    })
}

/// Join field error messages into one human-readable sentence
///
/// "A" / "A and B" / "A, B, and C". Returns an empty string for no errors.
pub fn error_sentence(errors: &[FieldError]) -> String {
    match errors {
        [] => String::new(),
        [only] => only.message.clone(),
        [first, second] => format!("{} and {}", first.message, second.message),
        [head @ .., last] => {
            let mut sentence = head
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            sentence.push_str(", and ");
            sentence.push_str(&last.message);
            sentence
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_us_input() -> BillingDetailInput {
        BillingDetailInput {
            full_name: Some("John Doe".to_string()),
            business_name: Some("Acme Corporation".to_string()),
            business_id: Some("VAT123456789".to_string()),
            street_address: Some("123 Main Street".to_string()),
            city: Some("New York".to_string()),
            state: Some("NY".to_string()),
            zip_code: Some("10001".to_string()),
            country_code: Some("US".to_string()),
            additional_notes: None,
        }
    }

    fn fields(errors: &[FieldError]) -> Vec<&'static str> {
        errors.iter().map(|e| e.field).collect()
    }

    #[test]
    fn test_valid_us_input_passes() {
        assert!(validate_billing_detail(&valid_us_input()).is_empty());
    }

    #[test]
    fn test_empty_input_reports_all_required_fields() {
        let errors = validate_billing_detail(&BillingDetailInput::default());

        assert_eq!(
            fields(&errors),
            vec![
                "full_name",
                "street_address",
                "city",
                "zip_code",
                "country_code",
                "country_code",
            ]
        );
        assert_eq!(errors[0].message, "Full name can't be blank");
        assert_eq!(errors[1].message, "Street address can't be blank");
        assert_eq!(errors[2].message, "City can't be blank");
        assert_eq!(errors[3].message, "Zip code can't be blank");
        assert_eq!(errors[4].message, "Country code can't be blank");
    }

    #[test]
    fn test_blank_country_code_reports_blank_and_length() {
        let mut input = valid_us_input();
        input.country_code = Some("".to_string());
        input.state = None;

        let errors = validate_billing_detail(&input);
        let country_errors: Vec<_> = errors.iter().filter(|e| e.field == "country_code").collect();

        assert_eq!(country_errors.len(), 2);
        assert_eq!(country_errors[0].message, "Country code can't be blank");
        assert_eq!(
            country_errors[1].message,
            "Country code is the wrong length (should be 2 characters)"
        );
    }

    #[test]
    fn test_state_required_when_country_is_us() {
        let mut input = valid_us_input();
        input.state = None;

        let errors = validate_billing_detail(&input);
        assert_eq!(fields(&errors), vec!["state"]);
        assert_eq!(errors[0].message, "State can't be blank");
    }

    #[test]
    fn test_whitespace_state_counts_as_blank_for_us() {
        let mut input = valid_us_input();
        input.state = Some("   ".to_string());

        let errors = validate_billing_detail(&input);
        assert_eq!(fields(&errors), vec!["state"]);
    }

    #[test]
    fn test_state_not_required_outside_us() {
        let mut input = valid_us_input();
        input.country_code = Some("GB".to_string());
        input.city = Some("London".to_string());
        input.zip_code = Some("SW1A 1AA".to_string());
        input.state = None;

        assert!(validate_billing_detail(&input).is_empty());
    }

    #[test]
    fn test_state_not_required_for_canada() {
        let mut input = valid_us_input();
        input.country_code = Some("CA".to_string());
        input.city = Some("Toronto".to_string());
        input.zip_code = Some("M5V 3A8".to_string());
        input.state = None;

        assert!(validate_billing_detail(&input).is_empty());
    }

    #[test]
    fn test_country_code_wrong_length() {
        let mut input = valid_us_input();
        input.country_code = Some("USA".to_string());

        let errors = validate_billing_detail(&input);
        assert_eq!(fields(&errors), vec!["country_code"]);
        assert_eq!(
            errors[0].message,
            "Country code is the wrong length (should be 2 characters)"
        );
    }

    #[test]
    fn test_single_character_country_code_fails() {
        let mut input = valid_us_input();
        input.country_code = Some("U".to_string());

        let errors = validate_billing_detail(&input);
        assert_eq!(fields(&errors), vec!["country_code"]);
    }

    #[test]
    fn test_optional_fields_may_be_absent() {
        let mut input = valid_us_input();
        input.business_name = None;
        input.business_id = None;
        input.additional_notes = None;

        assert!(validate_billing_detail(&input).is_empty());
    }

    #[test]
    fn test_is_state_required() {
        assert!(is_state_required("US"));
        assert!(!is_state_required("GB"));
        assert!(!is_state_required("CA"));
        assert!(!is_state_required(""));
        assert!(!is_state_required("us")); // codes are uppercase
    }

    #[test]
    fn test_error_sentence_empty() {
        assert_eq!(error_sentence(&[]), "");
    }

    #[test]
    fn test_error_sentence_single() {
        let mut input = valid_us_input();
        input.full_name = None;

        let errors = validate_billing_detail(&input);
        assert_eq!(error_sentence(&errors), "Full name can't be blank");
    }

    #[test]
    fn test_error_sentence_two() {
        let mut input = valid_us_input();
        input.full_name = None;
        input.city = None;

        let errors = validate_billing_detail(&input);
        assert_eq!(
            error_sentence(&errors),
            "Full name can't be blank and City can't be blank"
        );
    }

    #[test]
    fn test_error_sentence_three_or_more() {
        let mut input = valid_us_input();
        input.full_name = None;
        input.city = None;
        input.zip_code = None;

        let errors = validate_billing_detail(&input);
        assert_eq!(
            error_sentence(&errors),
            "Full name can't be blank, City can't be blank, and Zip code can't be blank"
        );
    }
}
