//! Proptest generators for property-based testing.

use proptest::prelude::*;

use pactum_core::{ContractStatus, NewContract, NewParty};

/// Generate a contract status.
pub fn contract_status() -> impl Strategy<Value = ContractStatus> {
    prop_oneof![
        Just(ContractStatus::Draft),
        Just(ContractStatus::PendingSignature),
        Just(ContractStatus::Signed),
        Just(ContractStatus::Void),
    ]
}

/// Generate a sequence of requested status changes.
pub fn status_requests(max_len: usize) -> impl Strategy<Value = Vec<ContractStatus>> {
    prop::collection::vec(contract_status(), 0..=max_len)
}

/// Generate a valid contract title.
pub fn title() -> impl Strategy<Value = String> {
    "[A-Z][A-Za-z0-9 ]{0,63}".prop_map(|s| s.trim_end().to_string())
}

/// Generate valid contract input without an expiry.
pub fn new_contract() -> impl Strategy<Value = NewContract> {
    (title(), "[a-z ]{0,80}", any::<bool>()).prop_map(|(title, description, is_template)| {
        NewContract::titled(title)
            .description(description)
            .template(is_template)
    })
}

/// Generate a plausible email address.
pub fn email() -> impl Strategy<Value = String> {
    ("[a-z][a-z0-9.]{0,15}", "[a-z]{1,12}", "(com|org|law|io)")
        .prop_map(|(local, domain, tld)| format!("{}@{}.{}", local, domain, tld))
}

/// Generate a plausible mobile number.
pub fn mobile() -> impl Strategy<Value = String> {
    (any::<bool>(), "[0-9]{7,15}").prop_map(|(plus, digits)| {
        if plus {
            format!("+{}", digits)
        } else {
            digits
        }
    })
}

/// Generate valid party input (no user link, no key).
pub fn new_party() -> impl Strategy<Value = NewParty> {
    (
        "[A-Z][a-z]{1,20}( [A-Z][a-z]{1,20})?",
        prop::option::of(email()),
        prop::option::of(mobile()),
        "(client|counterparty|witness|)",
    )
        .prop_map(|(name, email, mobile, role)| NewParty {
            email,
            mobile,
            ..NewParty::named(name).role(role)
        })
}

/// Generate a valid upload file name.
pub fn file_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,23}\\.(pdf|docx|txt)".prop_map(String::from)
}

/// Generate non-empty file contents of at most `max_len` bytes.
pub fn file_bytes(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=max_len.max(1))
}
