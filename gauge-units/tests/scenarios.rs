//! End-to-end behavior against the built-in SI database.

use gauge_units::{Converter, FormatOptions, Status, Unit, UnitSystem, UnitType};

fn si() -> UnitSystem {
    let system = UnitSystem::si();
    assert!(system.is_valid(), "{:?}", system.error_message());
    system
}

// =============================================================================
// Lookup
// =============================================================================

#[test]
fn test_unit_by_name() {
    let system = si();
    let meter = system.unit_by_name("meter");
    assert!(meter.is_valid());
    assert_eq!(meter.name().as_deref(), Some("meter"));
    assert_eq!(meter.symbol().as_deref(), Some("m"));
    assert!(!system.unit_by_name("foobarbaz").is_valid());
    assert!(!system.unit_by_name("").is_valid());
    assert!(!system.unit_by_name("Meter").is_valid());
}

#[test]
fn test_unit_by_symbol() {
    let system = si();
    assert_eq!(system.unit_by_symbol("m"), system.unit_by_name("meter"));
    assert!(!system.unit_by_symbol("").is_valid());
    assert!(!system.unit_by_symbol("FBZ").is_valid());
}

#[test]
fn test_parser_folds_case() {
    let system = si();
    assert_eq!(system.unit_from_string("Meter"), system.unit_by_name("meter"));
    assert_eq!(system.unit_from_string("KILOMETER"), system.unit_from_string("km"));
}

// =============================================================================
// Parsing and formatting
// =============================================================================

#[test]
fn test_empty_text_is_one() {
    let system = si();
    let one = system.dimensionless_unit_one();
    assert_eq!(system.unit_from_string(""), one);
    assert_eq!(system.unit_from_string(None::<&str>), one);
    assert_eq!(one.format(FormatOptions::default()), "1");
    assert_eq!(one.unit_type(), UnitType::Product);
}

#[test]
fn test_definition_form() {
    let system = si();
    let unit = system.unit_from_string("km.s^2");
    assert!(unit.is_valid());
    assert_eq!(unit.format(FormatOptions::default().definition()), "1000 m·s²");
    assert_eq!(
        unit.format(FormatOptions::default().definition().names()),
        "1000 meter·second²"
    );
}

#[test]
fn test_unknown_identifier() {
    let system = si();
    let unit = system.unit_from_string("fbb^2");
    assert!(!unit.is_valid());
    assert_eq!(unit.status(), Status::UnknownIdentifier);
    assert_eq!(unit.format(FormatOptions::default()), "");
    assert_eq!(unit.to_string(), "");
}

#[test]
fn test_surrounding_whitespace_rejected() {
    let system = si();
    assert!(!system.unit_from_string(" m").is_valid());
    assert!(!system.unit_from_string("m ").is_valid());
    assert!(system.unit_from_string("m s").is_valid());
}

#[test]
fn test_unit_types() {
    let system = si();
    assert_eq!(system.unit_from_string("m").unit_type(), UnitType::Basic);
    assert_eq!(system.unit_from_string("m.s").unit_type(), UnitType::Product);
    assert_eq!(system.unit_from_string("3.14 m").unit_type(), UnitType::Galilean);
    assert_eq!(system.unit_from_string("s @ 1970T00").unit_type(), UnitType::Timestamp);
    assert_eq!(system.unit_from_string("log(re: 1mW)").unit_type(), UnitType::Logarithmic);
    assert_eq!(system.unit_from_string("fbb").unit_type(), UnitType::Invalid);
}

#[test]
fn test_timestamp_format() {
    let system = si();
    let epoch = system.unit_from_string("s since 1970-01-01 00:00:00 UTC");
    assert_eq!(epoch.format(FormatOptions::default()), "s since 1970-01-01 00:00:00 UTC");
    assert_eq!(epoch.time_origin(), Some(-978_307_200.0));
}

// =============================================================================
// Equality
// =============================================================================

#[test]
fn test_invalid_units_compare_equal() {
    let system = si();
    let a = system.unit_from_string("fbb");
    let b = system.unit_by_name("foobarbaz");
    assert_eq!(a, b);
    assert_eq!(a, Unit::default());
    assert_ne!(a, system.unit_by_name("meter"));
    assert_ne!(system.unit_by_name("meter"), system.unit_by_name("ampere"));
}

#[test]
fn test_units_of_different_systems_differ() {
    let a = si();
    let b = si();
    assert_ne!(a.unit_by_name("meter"), b.unit_by_name("meter"));
    assert!(!(a.unit_by_name("meter") * b.unit_by_name("meter")).is_valid());
}

// =============================================================================
// Algebra
// =============================================================================

#[test]
fn test_temperature_offsets() {
    let system = si();
    let kelvin = system.unit_from_string("kelvin");
    let celsius = system.unit_from_string("degC");
    assert_eq!(&kelvin + 273.15, celsius);
    assert_eq!(&celsius - 273.15, kelvin);
    assert_eq!(273.15 + &kelvin, celsius);
    assert_eq!((&kelvin + 273.15).to_string(), "degree_Celsius");
}

#[test]
fn test_scaling_gram() {
    let system = si();
    let gram = system.unit_from_string("g");
    assert_eq!((&gram * 1000.0).to_string(), "kilogram");
    assert_eq!((&gram / 1000.0).to_string(), "1e-06 kilogram");
    assert_eq!(1000.0 * &gram, system.unit_by_name("kilogram"));
    assert_eq!(0.001 * &gram, system.unit_from_string("mg"));

    let kg = system.unit_by_name("kilogram");
    assert_eq!(1000.0 / &kg, 1.0 / &gram);
    assert!((&kg / &gram).is_dimensionless());
    assert!((&gram / &kg).is_dimensionless());
}

#[test]
fn test_products() {
    let system = si();
    let ohm = system.unit_by_name("ohm");
    let s_a = system.unit_from_string("s^-3.A^-2");
    let m2kg = system.unit_from_string("m^2.kg");
    let product = &s_a * &m2kg;
    assert_eq!(product, ohm);
    assert_eq!(&product / &s_a, m2kg);
    assert_eq!(&product / &m2kg, s_a);

    let m = system.unit_by_symbol("m");
    let s = system.unit_by_symbol("s");
    let ms = &m * &s;
    assert_eq!(&ms / &s, m);
    assert_eq!(&ms / &m, s);
    assert_eq!(ohm.raise(2), system.unit_from_string("m^4.kg^2.s^-6.A^-4"));
    assert_eq!(system.unit_from_string("m/s"), system.unit_from_string("m.s^-1"));
}

#[test]
fn test_powers_and_roots() {
    let system = si();
    let meter = system.unit_from_string("m");
    let cubic = system.unit_from_string("m^3");
    assert_eq!(meter.raise(3), cubic);
    assert_eq!(cubic.root(3), meter);
    assert!(!system.unit_from_string("m^2").root(3).is_valid());
    assert_eq!(system.unit_from_string("km^2").root(2), system.unit_from_string("km"));
}

#[test]
fn test_raise_to_zero_is_one() {
    let system = si();
    let unit = system.unit_from_string("km").raise(0);
    assert!(unit.is_valid());
    assert_eq!(unit, system.dimensionless_unit_one());
}

#[test]
fn test_logarithmic_reference() {
    let system = si();
    let watt = system.unit_by_name("watt");
    assert_eq!(
        watt.to_logarithmic(10.0),
        system.unit_from_string("lg(re 1 m^2.kg.s^-3)")
    );
    assert_eq!(watt.to_logarithmic(10.0).format(FormatOptions::default()), "lg(re W)");
}

#[test]
fn test_non_multiplicative_units() {
    let system = si();
    let celsius = system.unit_by_symbol("degC");
    let meter = system.unit_by_symbol("m");
    let product = &celsius * &meter;
    assert!(!product.is_valid());
    assert_eq!(product.status(), Status::Meaningless);
    assert!(!(product * meter).is_valid());
}

// =============================================================================
// Conversion
// =============================================================================

#[test]
fn test_speed_conversion() {
    let system = si();
    let from = system.unit_from_string("m/s");
    let to = system.unit_from_string("km/h");
    let converter = Converter::new(&from, &to);
    assert!(converter.is_valid());
    assert_eq!(converter.convert(1000.0 / 3600.0), 1.0);
}

#[test]
fn test_dimension_mismatch() {
    let system = si();
    let from = system.unit_from_string("m/s");
    let to = system.unit_from_string("m/s^2");
    let converter = Converter::new(&from, &to);
    assert!(!converter.is_valid());
    assert!(!Converter::can_convert(&from, &to));
    assert_eq!(converter.status(), Status::Meaningless);
    assert!(converter.convert(1.0).is_nan());
}

#[test]
fn test_temperature_conversion() {
    let system = si();
    let fahrenheit = system.unit_by_symbol("degF");
    let celsius = system.unit_by_symbol("degC");
    let kelvin = system.unit_by_symbol("K");
    let values = Converter::new(&fahrenheit, &celsius).convert_slice(&[32.0, 212.0, -40.0]);
    for (got, want) in values.iter().zip([0.0, 100.0, -40.0]) {
        assert!((got - want).abs() < 1e-9, "{} != {}", got, want);
    }
    let to_kelvin = Converter::new(&celsius, &kelvin);
    assert_eq!(to_kelvin.affine(), Some((1.0, 273.15)));
}

#[test]
fn test_decibel_milliwatt() {
    let system = si();
    let dbm = system.unit_from_string("0.1 lg(re 1 mW)");
    let watt = system.unit_by_name("watt");
    let converter = Converter::new(&dbm, &watt);
    assert!(converter.is_valid());
    assert!((converter.convert(30.0) - 1.0).abs() < 1e-12);
    let back = Converter::new(&watt, &dbm);
    assert!((back.convert(1.0) - 30.0).abs() < 1e-9);
}

#[test]
fn test_timestamp_conversion() {
    let system = si();
    let unix = system.unit_from_string("s since 1970-01-01 00:00:00 UTC");
    let reference = system.unit_from_string("s since 2001-01-01 00:00:00 UTC");
    let converter = Converter::new(&unix, &reference);
    assert!(converter.is_valid());
    assert_eq!(converter.convert(978_307_200.0), 0.0);
    assert!(!Converter::can_convert(&unix, &system.unit_by_name("second")));
}

#[test]
fn test_bulk_conversion_in_place() {
    let system = si();
    let converter = Converter::new(&system.unit_by_symbol("km"), &system.unit_by_symbol("m"));
    let mut values = [1.0, 2.5, -3.0];
    let copied = converter.convert_slice(&values);
    converter.convert_in_place(&mut values);
    assert_eq!(copied, values.to_vec());
    assert_eq!(copied, vec![1000.0, 2500.0, -3000.0]);
}

// =============================================================================
// Threads
// =============================================================================

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_shareable_types() {
    assert_send_sync::<Unit>();
    assert_send_sync::<Converter>();
    assert_send_sync::<UnitSystem>();
}

#[test]
fn test_converter_shared_across_threads() {
    let system = si();
    let converter = Converter::new(&system.unit_by_symbol("km"), &system.unit_by_symbol("m"));
    let fahrenheit = Converter::new(&system.unit_by_symbol("degF"), &system.unit_by_symbol("degC"));
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8u32)
            .map(|i| {
                let converter = &converter;
                let fahrenheit = &fahrenheit;
                scope.spawn(move || {
                    let value = f64::from(i);
                    for _ in 0..1000 {
                        assert_eq!(converter.convert(value), value * 1000.0);
                        assert!((fahrenheit.convert(212.0) - 100.0).abs() < 1e-9);
                    }
                    converter.convert_slice(&[value, -value])
                })
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            let value = i as f64;
            assert_eq!(handle.join().unwrap(), vec![value * 1000.0, -value * 1000.0]);
        }
    });
}

// =============================================================================
// Properties
// =============================================================================

mod properties {
    use super::*;
    use proptest::prelude::*;

    const BASE_SYMBOLS: [&str; 9] = ["m", "kg", "s", "A", "K", "mol", "cd", "rad", "sr"];

    /// Builds a product of base units from `(symbol index, power)` pairs
    fn product(system: &UnitSystem, factors: &[(usize, i32)]) -> Unit {
        factors
            .iter()
            .fold(system.dimensionless_unit_one(), |unit, &(index, power)| {
                unit * system.unit_by_symbol(BASE_SYMBOLS[index]).raise(power)
            })
    }

    fn factors() -> impl Strategy<Value = Vec<(usize, i32)>> {
        prop::collection::vec((0..BASE_SYMBOLS.len(), -4i32..=4), 0..5)
    }

    fn scale() -> impl Strategy<Value = f64> {
        prop_oneof![
            Just(1.0),
            Just(1000.0),
            Just(1e-6),
            1e-3f64..1e3,
        ]
    }

    proptest! {
        /// Inverting twice is the identity
        #[test]
        fn prop_invert_involution(f in factors(), k in scale()) {
            let system = si();
            let unit = product(&system, &f).scale_by(k);
            prop_assert_eq!(unit.invert().invert(), unit);
        }

        /// Scaling then dividing by the same factor is the identity
        #[test]
        fn prop_scale_round_trip(f in factors(), k in scale()) {
            let system = si();
            let unit = product(&system, &f);
            prop_assert_eq!((&unit * k) / k, unit);
        }

        /// Convertibility is symmetric
        #[test]
        fn prop_can_convert_symmetric(a in factors(), b in factors()) {
            let system = si();
            let a = product(&system, &a);
            let b = product(&system, &b);
            prop_assert_eq!(Converter::can_convert(&a, &b), Converter::can_convert(&b, &a));
        }

        /// Parsing the printed form of a product gives back the product
        #[test]
        fn prop_format_parse_idempotent(f in factors(), ascii in any::<bool>(), names in any::<bool>()) {
            let system = si();
            let unit = product(&system, &f);
            let mut options = FormatOptions::default().definition();
            if ascii {
                options = options.ascii();
            }
            if names {
                options = options.names();
            }
            let text = unit.format(options);
            prop_assert_eq!(system.unit_from_string(text.as_str()), unit.clone(), "{}", text);
            let short = unit.format(FormatOptions::default());
            prop_assert_eq!(system.unit_from_string(short.as_str()), unit, "{}", short);
        }
    }
}
