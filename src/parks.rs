//! The fixed set of parks kept in sync.

/// A park whose wait times and schedule are tracked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackedPark {
    /// Upstream facility id, also the store key for this park.
    pub id: &'static str,
    pub name: &'static str,
    pub slug: &'static str,
}

/// Tracked parks, in the order every sync cycle visits them.
pub const TRACKED_PARKS: &[TrackedPark] = &[
    TrackedPark {
        id: "80007944",
        name: "Magic Kingdom Park",
        slug: "magic-kingdom",
    },
    TrackedPark {
        id: "80007838",
        name: "Epcot",
        slug: "epcot",
    },
    TrackedPark {
        id: "80007998",
        name: "Disney's Hollywood Studios",
        slug: "hollywood-studios",
    },
    TrackedPark {
        id: "80007823",
        name: "Disney's Animal Kingdom Theme Park",
        slug: "animal-kingdom",
    },
    TrackedPark {
        id: "330339",
        name: "Disneyland Park",
        slug: "disneyland",
    },
    TrackedPark {
        id: "336894",
        name: "Disney California Adventure Park",
        slug: "disney-california-adventure",
    },
];
