//! The closed set of document slots and their canonical order.
//!
//! The order is part of the output contract: the index page and the imported
//! pages both follow it, and reordering is a breaking change.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    AcceptedFlightPlan,
    OperationalFlightPlan,
    MassBalance,
    Performance,
    Notams,
    Sigwx,
    Winds,
    MetarTaf,
    ChartsDeparture,
    ChartsDestination,
    ChartsAlternates,
}

pub const CANONICAL_ORDER: [Slot; 11] = [
    Slot::AcceptedFlightPlan,
    Slot::OperationalFlightPlan,
    Slot::MassBalance,
    Slot::Performance,
    Slot::Notams,
    Slot::Sigwx,
    Slot::Winds,
    Slot::MetarTaf,
    Slot::ChartsDeparture,
    Slot::ChartsDestination,
    Slot::ChartsAlternates,
];

impl Slot {
    pub fn required(self) -> bool {
        matches!(
            self,
            Slot::AcceptedFlightPlan | Slot::MassBalance | Slot::Performance | Slot::Notams
        )
    }

    /// Stable manifest key, also accepted on the CLI.
    pub fn key(self) -> &'static str {
        match self {
            Slot::AcceptedFlightPlan => "accepted_flight_plan",
            Slot::OperationalFlightPlan => "operational_flight_plan",
            Slot::MassBalance => "mass_balance",
            Slot::Performance => "performance",
            Slot::Notams => "notams",
            Slot::Sigwx => "sigwx",
            Slot::Winds => "winds",
            Slot::MetarTaf => "metar_taf",
            Slot::ChartsDeparture => "charts_departure",
            Slot::ChartsDestination => "charts_destination",
            Slot::ChartsAlternates => "charts_alternates",
        }
    }

    /// Fixed on-disk name within the docket working directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Slot::AcceptedFlightPlan => "accepted_flight_plan.pdf",
            Slot::OperationalFlightPlan => "operational_flight_plan.pdf",
            Slot::MassBalance => "mass_balance.pdf",
            Slot::Performance => "performance.pdf",
            Slot::Notams => "notams.pdf",
            Slot::Sigwx => "sigwx.pdf",
            Slot::Winds => "winds.pdf",
            Slot::MetarTaf => "metar_taf.pdf",
            Slot::ChartsDeparture => "charts_departure.pdf",
            Slot::ChartsDestination => "charts_destination.pdf",
            Slot::ChartsAlternates => "charts_alternates.pdf",
        }
    }

    /// Label printed on the index/checklist page.
    pub fn label(self) -> &'static str {
        match self {
            Slot::AcceptedFlightPlan => "Accepted Flight Plan",
            Slot::OperationalFlightPlan => "Operational Flight Plan",
            Slot::MassBalance => "Mass & Balance",
            Slot::Performance => "Performance",
            Slot::Notams => "NOTAMs",
            Slot::Sigwx => "SIGWX",
            Slot::Winds => "Wind Charts",
            Slot::MetarTaf => "METAR & TAF",
            Slot::ChartsDeparture => "Charts: Departure",
            Slot::ChartsDestination => "Charts: Destination",
            Slot::ChartsAlternates => "Charts: Alternates",
        }
    }

    pub fn is_chart(self) -> bool {
        matches!(
            self,
            Slot::ChartsDeparture | Slot::ChartsDestination | Slot::ChartsAlternates
        )
    }

    pub fn from_key(key: &str) -> Option<Slot> {
        CANONICAL_ORDER.iter().copied().find(|slot| slot.key() == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_is_the_documented_contract() {
        let labels: Vec<&str> = CANONICAL_ORDER.iter().map(|slot| slot.label()).collect();
        assert_eq!(
            labels,
            [
                "Accepted Flight Plan",
                "Operational Flight Plan",
                "Mass & Balance",
                "Performance",
                "NOTAMs",
                "SIGWX",
                "Wind Charts",
                "METAR & TAF",
                "Charts: Departure",
                "Charts: Destination",
                "Charts: Alternates",
            ]
        );
    }

    #[test]
    fn exactly_four_slots_are_required() {
        let required: Vec<Slot> = CANONICAL_ORDER
            .iter()
            .copied()
            .filter(|slot| slot.required())
            .collect();
        assert_eq!(
            required,
            [
                Slot::AcceptedFlightPlan,
                Slot::MassBalance,
                Slot::Performance,
                Slot::Notams
            ]
        );
    }

    #[test]
    fn keys_round_trip() {
        for slot in CANONICAL_ORDER {
            assert_eq!(Slot::from_key(slot.key()), Some(slot));
        }
        assert_eq!(Slot::from_key("no_such_slot"), None);
    }
}
