use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::organization::{OrganizationId, OrganizationRef};
use crate::domain::person::PersonId;
use crate::domain::seat::BoardSeat;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedPerson {
    pub person_id: PersonId,
    pub name: String,
    pub titles_at_first: Vec<String>,
    pub titles_at_second: Vec<String>,
}

/// Unordered organization pair with every person seated at both during a common period.
/// `first.id` always sorts before `second.id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapResult {
    pub first: OrganizationRef,
    pub second: OrganizationRef,
    pub shared_people: Vec<SharedPerson>,
    pub shared_count: usize,
}

impl OverlapResult {
    pub fn pair_key(&self) -> (&OrganizationId, &OrganizationId) {
        (&self.first.id, &self.second.id)
    }
}

#[derive(Clone, Debug, Default)]
pub struct OverlapDetector;

impl OverlapDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, seats: &[&BoardSeat]) -> Vec<OverlapResult> {
        let mut seats_by_person: BTreeMap<&PersonId, BTreeMap<&OrganizationId, Vec<&BoardSeat>>> =
            BTreeMap::new();
        for seat in seats.iter().copied() {
            seats_by_person
                .entry(&seat.person.id)
                .or_default()
                .entry(&seat.organization.id)
                .or_default()
                .push(seat);
        }

        let mut pairs: BTreeMap<(OrganizationId, OrganizationId), PairAccumulator> =
            BTreeMap::new();

        for (person_id, seats_by_organization) in &seats_by_person {
            if seats_by_organization.len() < 2 {
                continue;
            }

            let organizations: Vec<(&OrganizationId, &Vec<&BoardSeat>)> =
                seats_by_organization.iter().map(|(id, seats)| (*id, seats)).collect();
            for (index, &(first_id, first_seats)) in organizations.iter().enumerate() {
                for &(second_id, second_seats) in &organizations[index + 1..] {
                    let concurrent = first_seats.iter().any(|left| {
                        second_seats.iter().any(|right| left.tenure.overlaps(&right.tenure))
                    });
                    if !concurrent {
                        continue;
                    }

                    let accumulator = pairs
                        .entry((first_id.clone(), second_id.clone()))
                        .or_insert_with(|| PairAccumulator {
                            first: first_seats[0].organization.clone(),
                            second: second_seats[0].organization.clone(),
                            people: BTreeMap::new(),
                        });
                    accumulator.people.entry((*person_id).clone()).or_insert_with(|| {
                        SharedPerson {
                            person_id: (*person_id).clone(),
                            name: first_seats[0].person.full_name(),
                            titles_at_first: distinct_titles(first_seats),
                            titles_at_second: distinct_titles(second_seats),
                        }
                    });
                }
            }
        }

        let mut overlaps = pairs
            .into_values()
            .map(|accumulator| {
                let shared_people = accumulator.people.into_values().collect::<Vec<_>>();
                OverlapResult {
                    first: accumulator.first,
                    second: accumulator.second,
                    shared_count: shared_people.len(),
                    shared_people,
                }
            })
            .collect::<Vec<_>>();

        overlaps.sort_by(|left, right| {
            right
                .shared_count
                .cmp(&left.shared_count)
                .then_with(|| left.pair_key().cmp(&right.pair_key()))
        });
        overlaps
    }
}

struct PairAccumulator {
    first: OrganizationRef,
    second: OrganizationRef,
    people: BTreeMap<PersonId, SharedPerson>,
}

fn distinct_titles(seats: &[&BoardSeat]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    seats
        .iter()
        .map(|seat| seat.title.trim().to_string())
        .filter(|title| !title.is_empty() && seen.insert(title.clone()))
        .collect()
}
