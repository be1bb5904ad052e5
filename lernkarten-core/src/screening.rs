use crate::{Card, CardDraft, UserId};
use std::collections::HashSet;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Screened {
    pub accepted: Vec<CardDraft>,
    pub duplicates: Vec<CardDraft>,
}

/// Splits a generated or imported batch into drafts worth persisting and
/// drafts that repeat an existing card (or an earlier draft of the batch).
pub fn screen_batch(existing: &[Card], user_id: &UserId, drafts: Vec<CardDraft>) -> Screened {
    let mut seen: HashSet<(String, String)> = existing
        .iter()
        .filter(|c| &c.user_id == user_id)
        .map(|c| (c.front.clone(), c.back.clone()))
        .collect();

    let mut out = Screened::default();
    for d in drafts {
        if seen.insert((d.front.clone(), d.back.clone())) {
            out.accepted.push(d);
        } else {
            out.duplicates.push(d);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn drops_existing_and_repeated_drafts() {
        let user = UserId::from("ana");
        let other = UserId::from("ben");
        let now = Utc::now();
        let existing = vec![
            Card::new(user.clone(), "hola", "hello", now),
            Card::new(other.clone(), "adios", "goodbye", now),
        ];
        let drafts = vec![
            CardDraft::new("hola", "hello"),
            CardDraft::new("adios", "goodbye"),
            CardDraft::new("gracias", "thanks"),
            CardDraft::new("gracias", "thanks"),
            CardDraft::new("hola", "hi"),
        ];

        let s = screen_batch(&existing, &user, drafts);
        assert_eq!(
            s.accepted,
            vec![
                CardDraft::new("adios", "goodbye"),
                CardDraft::new("gracias", "thanks"),
                CardDraft::new("hola", "hi"),
            ]
        );
        assert_eq!(s.duplicates.len(), 2);
    }
}
