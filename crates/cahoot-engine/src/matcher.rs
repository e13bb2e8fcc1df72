//! Single-scope query execution: translating (targets, scope) into the
//! predicate algebra and post-filtering the backend's aggregate rows.
//!
//! The translation is pure and backend-agnostic so it can be unit-tested
//! against an in-memory store.

use std::collections::HashSet;

use cahoot_core::{
  Error, Result,
  query::RelatedContactsParams,
  scope::AffinityScope,
  store::{
    AddressCount, AggregateRequest, EventStore, MatchClause, MessageMatch,
    TargetPredicate,
  },
};

// ─── Predicate construction ──────────────────────────────────────────────────

/// Build the DNF predicate for one (targets, scope) pair.
///
/// Fails fast with [`Error::EmptyTargets`] before any backend work: a query
/// with no targets has nothing to anchor on.
pub fn target_predicate(
  params: &RelatedContactsParams,
  scope: AffinityScope,
) -> Result<TargetPredicate> {
  if params.targets.is_empty() {
    return Err(Error::EmptyTargets);
  }
  let targets = &params.targets;

  let any = match scope {
    // All targets on one message, each in its declared field.
    AffinityScope::OutgoingExactMatch => vec![MessageMatch::new(
      targets
        .iter()
        .map(|t| MatchClause::RecipientInField {
          address: t.address.clone(),
          field:   t.field,
        })
        .collect(),
    )],

    // All targets on one message, declared fields ignored.
    AffinityScope::OutgoingExactMatchAnyField => vec![MessageMatch::new(
      targets
        .iter()
        .map(|t| MatchClause::RecipientIs { address: t.address.clone() })
        .collect(),
    )],

    // Any one target, in its declared field.
    AffinityScope::OutgoingBroadMatch => targets
      .iter()
      .map(|t| {
        MessageMatch::new(vec![MatchClause::RecipientInField {
          address: t.address.clone(),
          field:   t.field,
        }])
      })
      .collect(),

    // Any one target, declared fields ignored.
    AffinityScope::OutgoingBroadMatchAnyField => targets
      .iter()
      .map(|t| {
        MessageMatch::new(vec![MatchClause::RecipientIs {
          address: t.address.clone(),
        }])
      })
      .collect(),

    // The sender is one target and every other target co-occurs as a
    // recipient. Declared fields are never checked on incoming scopes: the
    // sender occupies no to/cc/bcc slot, and co-recipients are matched by
    // address alone.
    AffinityScope::IncomingFromTarget => targets
      .iter()
      .enumerate()
      .map(|(i, anchor)| {
        let mut all =
          vec![MatchClause::SenderIs { address: anchor.address.clone() }];
        all.extend(targets.iter().enumerate().filter(|(j, _)| *j != i).map(
          |(_, other)| MatchClause::RecipientIs {
            address: other.address.clone(),
          },
        ));
        MessageMatch::new(all)
      })
      .collect(),

    // Any one target as a recipient; the sender is unconstrained.
    AffinityScope::IncomingFromAnySender => targets
      .iter()
      .map(|t| {
        MessageMatch::new(vec![MatchClause::RecipientIs {
          address: t.address.clone(),
        }])
      })
      .collect(),
  };

  Ok(TargetPredicate::new(any))
}

// ─── Scope execution ─────────────────────────────────────────────────────────

/// Run one scope against the store and return its raw scored rows.
///
/// Post-filters the aggregate: the owner's own address and every target are
/// excluded, and addresses below `min_occur` are dropped entirely. The
/// backend's descending order is preserved.
pub async fn run_scope<S: EventStore>(
  store: &S,
  params: &RelatedContactsParams,
  scope: AffinityScope,
) -> Result<Vec<AddressCount>> {
  let predicate = target_predicate(params, scope)?;
  let request = AggregateRequest {
    mailbox_id: params.mailbox_id,
    direction: scope.direction(),
    predicate,
    // `requested_field` constrains the returned contact's slot only; for
    // incoming mail it never applies to the sender.
    result_field: params.requested_field,
    cutoff: params.date_cutoff,
  };

  let rows = store.aggregate(&request).await.map_err(Error::backend)?;

  let excluded: HashSet<&str> = params
    .targets
    .iter()
    .map(|t| t.address.as_str())
    .chain(std::iter::once(params.owner_address.as_str()))
    .collect();

  Ok(
    rows
      .into_iter()
      .filter(|row| !excluded.contains(row.address.as_str()))
      .filter(|row| row.count >= u64::from(params.min_occur))
      .collect(),
  )
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use cahoot_core::{event::ParticipantField, query::AffinityTarget};
  use uuid::Uuid;

  use super::*;

  fn params(targets: Vec<AffinityTarget>) -> RelatedContactsParams {
    RelatedContactsParams::new(Uuid::new_v4(), "owner@x.test", targets)
  }

  fn two_targets() -> RelatedContactsParams {
    params(vec![
      AffinityTarget::new(ParticipantField::To, "a@x.test"),
      AffinityTarget::new(ParticipantField::Cc, "b@x.test"),
    ])
  }

  #[test]
  fn empty_targets_is_a_configuration_error() {
    let err = target_predicate(&params(vec![]), AffinityScope::OutgoingExactMatch)
      .unwrap_err();
    assert!(matches!(err, Error::EmptyTargets));
  }

  #[test]
  fn exact_match_is_one_conjunction_with_fields() {
    let p = target_predicate(&two_targets(), AffinityScope::OutgoingExactMatch)
      .unwrap();
    assert_eq!(p.any, vec![MessageMatch::new(vec![
      MatchClause::RecipientInField {
        address: "a@x.test".into(),
        field:   ParticipantField::To,
      },
      MatchClause::RecipientInField {
        address: "b@x.test".into(),
        field:   ParticipantField::Cc,
      },
    ])]);
  }

  #[test]
  fn any_field_variants_drop_the_field_check() {
    let p = target_predicate(
      &two_targets(),
      AffinityScope::OutgoingExactMatchAnyField,
    )
    .unwrap();
    assert_eq!(p.any, vec![MessageMatch::new(vec![
      MatchClause::RecipientIs { address: "a@x.test".into() },
      MatchClause::RecipientIs { address: "b@x.test".into() },
    ])]);
  }

  #[test]
  fn broad_match_is_one_alternative_per_target() {
    let p = target_predicate(&two_targets(), AffinityScope::OutgoingBroadMatch)
      .unwrap();
    assert_eq!(p.any.len(), 2);
    assert_eq!(p.any[0], MessageMatch::new(vec![
      MatchClause::RecipientInField {
        address: "a@x.test".into(),
        field:   ParticipantField::To,
      },
    ]));
    assert_eq!(p.any[1], MessageMatch::new(vec![
      MatchClause::RecipientInField {
        address: "b@x.test".into(),
        field:   ParticipantField::Cc,
      },
    ]));
  }

  #[test]
  fn incoming_from_target_anchors_each_target_as_sender() {
    let p = target_predicate(&two_targets(), AffinityScope::IncomingFromTarget)
      .unwrap();
    assert_eq!(p.any, vec![
      MessageMatch::new(vec![
        MatchClause::SenderIs { address: "a@x.test".into() },
        MatchClause::RecipientIs { address: "b@x.test".into() },
      ]),
      MessageMatch::new(vec![
        MatchClause::SenderIs { address: "b@x.test".into() },
        MatchClause::RecipientIs { address: "a@x.test".into() },
      ]),
    ]);
  }

  #[test]
  fn incoming_from_any_sender_has_no_sender_clause() {
    let p = target_predicate(&two_targets(), AffinityScope::IncomingFromAnySender)
      .unwrap();
    assert_eq!(p.any.len(), 2);
    assert!(p.any.iter().all(|alt| {
      alt
        .all
        .iter()
        .all(|c| matches!(c, MatchClause::RecipientIs { .. }))
    }));
  }
}
