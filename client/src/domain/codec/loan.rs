//! Loans service records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{EntityCodec, Resource, dates};
use crate::domain::{
    CanonicalStatus, EntityId, LegacyStatus, Loan, LoanDraft, LoanPatch, MAX_LOAN_DAYS,
    ValidationError,
};

/// Loan as returned by the loans service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteLoan {
    /// Numeric key.
    pub id: u64,
    /// Borrower key.
    pub user_id: u64,
    /// Book key.
    pub book_id: u64,
    /// Request instant.
    #[serde(with = "dates::required")]
    pub loan_date: DateTime<Utc>,
    /// Due instant.
    #[serde(with = "dates::required")]
    pub due_date: DateTime<Utc>,
    /// Return instant, when reported.
    #[serde(
        default,
        with = "dates::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub return_date: Option<DateTime<Utc>>,
    /// Canonical status.
    pub status: CanonicalStatus,
    /// Extensions granted so far.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renewals: Option<u32>,
}

/// Loans served by the loans service.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoanResource;

impl EntityCodec for LoanResource {
    type Remote = RemoteLoan;
    type Local = Loan;
    type Draft = LoanDraft;
    type Patch = LoanPatch;

    /// The return date is kept only for returned loans. A returned loan
    /// without one is taken to have come back on its due date.
    fn to_local(remote: RemoteLoan) -> Loan {
        let return_date = match remote.status {
            CanonicalStatus::Returned => Some(remote.return_date.unwrap_or(remote.due_date)),
            _ => None,
        };
        Loan {
            id: EntityId::from(remote.id),
            user_id: EntityId::from(remote.user_id),
            book_id: EntityId::from(remote.book_id),
            loan_date: remote.loan_date,
            due_date: remote.due_date,
            return_date,
            status: remote.status.to_legacy(),
            renewals: remote.renewals.unwrap_or_default(),
        }
    }

    fn to_remote(local: &Loan) -> Option<RemoteLoan> {
        Some(RemoteLoan {
            id: local.id.remote_id()?,
            user_id: local.user_id.remote_id()?,
            book_id: local.book_id.remote_id()?,
            loan_date: local.loan_date,
            due_date: local.due_date,
            return_date: local.return_date,
            status: local.status.to_canonical(),
            renewals: Some(local.renewals),
        })
    }

    fn draft_payload(draft: &LoanDraft) -> Option<Value> {
        Some(json!({
            "userId": draft.user_id.remote_id()?,
            "bookId": draft.book_id.remote_id()?,
            "loanDays": draft.loan_days,
        }))
    }

    fn patch_payload(patch: &LoanPatch) -> Value {
        let mut body = Map::new();
        if let Some(due_date) = patch.due_date {
            body.insert("dueDate".into(), due_date.to_rfc3339().into());
        }
        Value::Object(body)
    }
}

impl Resource for LoanResource {
    const ENTITY: &'static str = "loan";
    const STORE_KEY: &'static str = "loans";

    fn id(local: &Loan) -> &EntityId {
        &local.id
    }

    fn validate_draft(draft: &LoanDraft) -> Result<(), ValidationError> {
        draft.validate()?;
        if draft.loan_days == 0 {
            return Err(ValidationError::invalid("loanDays", "must be at least one day"));
        }
        if draft.loan_days > MAX_LOAN_DAYS {
            return Err(ValidationError::invalid(
                "loanDays",
                format!("must not exceed {MAX_LOAN_DAYS} days"),
            ));
        }
        Ok(())
    }

    fn check_local_update(
        _cached: &[Loan],
        target: &Loan,
        patch: &LoanPatch,
    ) -> Result<(), ValidationError> {
        match patch.due_date {
            Some(due_date) if due_date < target.loan_date => Err(ValidationError::invalid(
                "dueDate",
                "must not precede the loan date",
            )),
            _ => Ok(()),
        }
    }

    /// The due date saturates at the latest representable instant.
    fn synthesize(draft: &LoanDraft, id: EntityId, now: DateTime<Utc>) -> Loan {
        let due_date = now
            .checked_add_signed(Duration::days(i64::from(draft.loan_days)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Loan {
            id,
            user_id: draft.user_id.clone(),
            book_id: draft.book_id.clone(),
            loan_date: now,
            due_date,
            return_date: None,
            status: LegacyStatus::Pendiente,
            renewals: 0,
        }
    }

    fn merge(local: &mut Loan, patch: &LoanPatch) {
        if let Some(due_date) = patch.due_date {
            local.due_date = due_date;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).single().expect("date")
    }

    fn remote(status: &str, return_date: Option<&str>) -> RemoteLoan {
        let mut body = json!({
            "id": 5,
            "userId": 2,
            "bookId": 8,
            "loanDate": "2025-03-01T09:00:00",
            "dueDate": "2025-03-15",
            "status": status,
        });
        if let Some(return_date) = return_date {
            body["returnDate"] = return_date.into();
        }
        serde_json::from_value(body).expect("decode loan")
    }

    #[rstest]
    #[case("PENDING", LegacyStatus::Pendiente)]
    #[case("ACTIVE", LegacyStatus::Aprobado)]
    #[case("OVERDUE", LegacyStatus::Aprobado)]
    #[case("CANCELLED", LegacyStatus::Rechazado)]
    #[case("RETURNED", LegacyStatus::Devuelto)]
    fn decodes_canonical_status_to_display_status(
        #[case] status: &str,
        #[case] expected: LegacyStatus,
    ) {
        let local = LoanResource::to_local(remote(status, None));
        assert_eq!(local.status, expected);
        assert_eq!(local.return_date.is_some(), expected == LegacyStatus::Devuelto);
    }

    #[test]
    fn drops_stray_return_dates() {
        let local = LoanResource::to_local(remote("ACTIVE", Some("2025-03-10")));
        assert_eq!(local.return_date, None);
    }

    #[test]
    fn keeps_the_reported_return_date() {
        let local = LoanResource::to_local(remote("RETURNED", Some("2025-03-10T12:00:00Z")));
        assert_eq!(
            local.return_date,
            Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).single()
        );
    }

    #[test]
    fn remote_round_trip_preserves_shared_fields() {
        let original = Loan {
            id: EntityId::new("5"),
            user_id: EntityId::new("2"),
            book_id: EntityId::new("8"),
            loan_date: at(1),
            due_date: at(15),
            return_date: Some(at(12)),
            status: LegacyStatus::Devuelto,
            renewals: 1,
        };
        let remote = LoanResource::to_remote(&original).expect("numeric ids");
        let encoded = serde_json::to_value(&remote).expect("encode");
        let decoded: RemoteLoan = serde_json::from_value(encoded).expect("decode");
        assert_eq!(LoanResource::to_local(decoded), original);
    }

    #[test]
    fn draft_payload_requires_remote_foreign_keys() {
        let payload = LoanResource::draft_payload(&LoanDraft::new("8", "2")).expect("numeric");
        assert_eq!(payload, json!({"userId": 2, "bookId": 8, "loanDays": 14}));
        assert!(LoanResource::draft_payload(&LoanDraft::new("b1", "u1")).is_none());
    }

    #[test]
    fn synthesized_loans_are_pending_for_the_requested_days() {
        let loan = LoanResource::synthesize(&LoanDraft::new("b1", "u1"), EntityId::generate(), at(1));
        assert_eq!(loan.status, LegacyStatus::Pendiente);
        assert_eq!(loan.due_date, at(15));
        assert_eq!(loan.return_date, None);
    }

    #[rstest]
    #[case(0)]
    #[case(MAX_LOAN_DAYS + 1)]
    #[case(u32::MAX)]
    fn drafts_outside_the_loan_length_range_are_invalid(#[case] days: u32) {
        let draft = LoanDraft::new("b1", "u1").loan_days(days);
        assert!(matches!(
            LoanResource::validate_draft(&draft),
            Err(ValidationError::Invalid { field: "loanDays", .. })
        ));
    }

    #[test]
    fn synthesized_due_dates_saturate_instead_of_overflowing() {
        let draft = LoanDraft::new("b1", "u1").loan_days(u32::MAX);
        let late = DateTime::<Utc>::MAX_UTC - Duration::days(1);

        let loan = LoanResource::synthesize(&draft, EntityId::generate(), late);

        assert_eq!(loan.due_date, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn local_update_keeps_due_date_after_loan_date() {
        let loan = LoanResource::synthesize(&LoanDraft::new("b1", "u1"), EntityId::generate(), at(5));
        let patch = LoanPatch {
            due_date: Some(at(4)),
        };
        assert!(LoanResource::check_local_update(&[], &loan, &patch).is_err());
    }
}
