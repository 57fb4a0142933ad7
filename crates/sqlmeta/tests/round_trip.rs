//! Property: whatever is saved is what is found again.

mod common;

use chrono::{NaiveDate, NaiveDateTime};
use common::{Sample, Team, database};
use proptest::prelude::*;
use sqlmeta::Value;
use sqlmeta::descriptor;

fn date() -> impl Strategy<Value = NaiveDate> {
    (1970_i32..2100, 1_u32..=12, 1_u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn timestamp() -> impl Strategy<Value = NaiveDateTime> {
    (date(), 0_u32..24, 0_u32..60, 0_u32..60, 0_u32..1_000_000).prop_map(|(d, h, mi, s, us)| {
        d.and_hms_micro_opt(h, mi, s, us).unwrap()
    })
}

prop_compose! {
    fn sample()(
        flag in any::<bool>(),
        small in any::<i32>(),
        big in any::<i64>(),
        ratio in -1.0e12_f64..1.0e12,
        label in "\\PC{0,40}",
        data in proptest::collection::vec(any::<u8>(), 0..64),
        note in proptest::option::of("[a-z ]{0,20}"),
        day in proptest::option::of(date()),
        at in proptest::option::of(timestamp()),
    ) -> Sample {
        Sample { id: 0, flag, small, big, ratio, label, data, note, day, at }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn saved_samples_are_found_unchanged(mut original in sample()) {
        let (_dir, db) = database();
        db.save(&mut original).unwrap();
        prop_assert!(original.id > 0);

        let found: Sample = db.find(original.id).unwrap().unwrap();
        prop_assert_eq!(found, original);
    }

    #[test]
    fn cursor_never_crosses_into_the_next_table(
        id_a in 1_i64..1_000,
        name in "[a-z]{1,12}",
        id_b in 1_i64..1_000,
        title in "[a-z]{1,12}",
    ) {
        let teams = descriptor::<Team>().unwrap();
        let row = vec![
            Value::BigInt(id_a),
            Value::Text(name.clone()),
            Value::BigInt(id_b),
            Value::Text(title.clone()),
        ];

        let mut a = Team::default();
        let mut b = Team::default();
        let mut cursor = 0;
        teams.load(&mut a, &row, &mut cursor).unwrap();
        prop_assert_eq!(cursor, 2);
        teams.load(&mut b, &row, &mut cursor).unwrap();
        prop_assert_eq!(cursor, 4);

        prop_assert_eq!(a, Team { id: id_a, name });
        prop_assert_eq!(b, Team { id: id_b, name: title });
    }
}
