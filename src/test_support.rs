use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ownerdedup::model::{Event, HousingId, HousingKey, HousingOwnerLink, Note, Owner};
use ownerdedup::store::MemoryStore;

const STREETS: &[&str] = &[
    "RUE DE LA GABARRE",
    "AV DE LA ROUDET",
    "AV DU PRESIDENT WILSON",
    "BD DES CAPUCINES",
    "RUE NEUVE",
    "IMPASSE DES LILAS",
];

const CITIES: &[(&str, &str)] = &[
    ("64500", "SAINT-JEAN-DE-LUZ"),
    ("33500", "LIBOURNE"),
    ("93100", "MONTREUIL"),
    ("75008", "PARIS"),
    ("44000", "NANTES"),
];

const LAST_NAMES: &[&str] = &["DURAND", "MARTIN", "BERNARD", "PETIT", "ROBERT", "RICHARD"];
const FIRST_NAMES: &[&str] = &["JEAN", "MARIE", "PAUL", "LOUISE", "PIERRE", "JEANNE"];

#[derive(Debug, Clone)]
pub struct GeneratedPopulation {
    pub owners: Vec<Owner>,
    /// Number of distinct identities behind the owner rows.
    #[allow(dead_code)]
    pub identities: usize,
}

/// Generate an owner population in which some identities appear as
/// several rows with import-style address variations: zero-padded street
/// numbers and alternate city spellings.
#[allow(dead_code)]
pub fn generate_population(
    identities: usize,
    duplicate_probability: f64,
    seed: u64,
) -> GeneratedPopulation {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut owners = Vec::new();

    for i in 0..identities {
        let full_name = format!(
            "{} {} {:04}",
            LAST_NAMES[rng.random_range(0..LAST_NAMES.len())],
            FIRST_NAMES[rng.random_range(0..FIRST_NAMES.len())],
            i
        );
        let street = STREETS[rng.random_range(0..STREETS.len())];
        let number = rng.random_range(1..200);
        let (postal, city) = CITIES[rng.random_range(0..CITIES.len())];

        owners.push(Owner::new(
            full_name.clone(),
            vec![
                format!("{number} {street}"),
                format!("{postal} {city}"),
            ],
        ));

        if rng.random_bool(duplicate_probability) {
            // Same address as written by another import: padded street
            // number, city spelled with spaces instead of hyphens.
            owners.push(Owner::new(
                full_name,
                vec![
                    format!("{number:04} {street}"),
                    format!("{postal} {}", city.replace('-', " ")),
                ],
            ));
        }
    }

    GeneratedPopulation { owners, identities }
}

/// Seed a store with the given owners, one active housing link each, and
/// an event and a note per owner.
#[allow(dead_code)]
pub fn seed_store(owners: &[Owner]) -> MemoryStore {
    let store = MemoryStore::new();
    for owner in owners {
        store.insert_owner(owner.clone());
        let housing = HousingKey::new(HousingId::new(), "00000");
        store.insert_link(HousingOwnerLink::new(owner.id, housing, 1));
        store.insert_event(Event::new(owner.id, "campaign"));
        store.insert_note(Note::new(owner.id, "imported"));
    }
    store
}

/// Build owner address lines from string literals.
#[allow(dead_code)]
pub fn lines(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}
