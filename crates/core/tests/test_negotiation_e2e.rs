//! End-to-end negotiation scenarios across the public API
//!
//! Exercises the full engine the way a transport layer would drive it:
//! realistic capability surfaces with several categories, mixed value
//! domains, preferences, and the documented failure modes.

use remoteimage_core::capabilities::{
    negotiation, Capability, CapabilitySet, Generator, Negotiable, NumericRange, ParamValue,
    ValueClass,
};

fn quality_range(lo: i64, hi: i64) -> Negotiable {
    Negotiable::range(NumericRange::integers(lo, hi).unwrap())
}

fn int_set(values: impl IntoIterator<Item = i64>) -> Negotiable {
    Negotiable::set(values.into_iter().map(ParamValue::Integer)).unwrap()
}

/// The canonical tile-codec agreement: server supports quality 0-100,
/// client 50-100, the user prefers at most 80. Everyone should settle on
/// 50-80.
#[test]
fn test_jpeg_quality_three_way_agreement() {
    let mut server = CapabilitySet::new(false);
    server
        .add(
            Capability::non_preference("format", "jpeg")
                .param("quality", ValueClass::Integer)
                .value("quality", quality_range(0, 100))
                .generator(Generator::new("TileEncoderFactory"))
                .build()
                .unwrap(),
        )
        .unwrap();

    let mut client = CapabilitySet::new(false);
    client
        .add(
            Capability::non_preference("format", "jpeg")
                .param("quality", ValueClass::Integer)
                .value("quality", quality_range(50, 100))
                .generator(Generator::new("TileDecoderFactory"))
                .build()
                .unwrap(),
        )
        .unwrap();

    let mut prefs = CapabilitySet::new(true);
    prefs
        .add(
            Capability::preference("format", "jpeg")
                .param("quality", ValueClass::Integer)
                .value("quality", quality_range(0, 80))
                .build()
                .unwrap(),
        )
        .unwrap();

    // Server against client first.
    let supported = server.negotiate(&client).unwrap();
    let agreed = supported.negotiated_value("format").unwrap();
    assert_eq!(agreed.value_of("quality"), Some(&quality_range(50, 100)));

    // Then the whole three-way combination.
    let result = negotiation::negotiate(Some(&prefs), &server, &client)
        .unwrap()
        .unwrap();
    assert!(!result.is_preference());

    let agreed = result.negotiated_value("format").unwrap();
    assert_eq!(agreed.value_of("quality"), Some(&quality_range(50, 80)));
    assert_eq!(
        agreed.negotiated_value("quality").unwrap(),
        Some(ParamValue::Integer(50))
    );

    // Both factories are identifiable from the agreed capability.
    let labels: Vec<&str> = agreed
        .generators()
        .iter()
        .map(|g| g.label.as_str())
        .collect();
    assert_eq!(labels, ["TileEncoderFactory", "TileDecoderFactory"]);
}

/// Categories unique to one party vanish; a shared category with no
/// acceptable pair fails the whole negotiation even though both inputs
/// were individually valid.
#[test]
fn test_category_intersection_and_all_or_nothing() {
    let codec = |lo, hi| {
        Capability::non_preference("tileCodec", "jpeg")
            .param("quality", ValueClass::Integer)
            .value("quality", quality_range(lo, hi))
            .build()
            .unwrap()
    };
    let color_model = Capability::non_preference("colorModel", "rgb")
        .param("bitsPerSample", ValueClass::Integer)
        .value("bitsPerSample", int_set([8, 16]))
        .build()
        .unwrap();
    let transport = Capability::non_preference("transport", "sockets")
        .param("window", ValueClass::Integer)
        .value("window", Negotiable::single(8i64))
        .build()
        .unwrap();

    // Server: {tileCodec, colorModel}; client: {tileCodec, transport}.
    let mut server = CapabilitySet::new(false);
    server.add(codec(0, 100)).unwrap();
    server.add(color_model).unwrap();
    let mut client = CapabilitySet::new(false);
    client.add(codec(50, 100)).unwrap();
    client.add(transport).unwrap();

    let result = server.negotiate(&client).unwrap();
    assert_eq!(result.categories(), ["tileCodec"]);

    // Make the only shared category unsatisfiable: everything fails.
    let mut narrow_client = CapabilitySet::new(false);
    narrow_client.add(codec(0, 10)).unwrap();
    let mut narrow_server = CapabilitySet::new(false);
    narrow_server.add(codec(50, 100)).unwrap();
    assert!(narrow_server.negotiate(&narrow_client).is_none());
}

/// Earliest-added capability wins wherever a single answer is needed.
#[test]
fn test_priority_follows_insertion_order() {
    let codec = |name: &str, lo, hi| {
        Capability::non_preference("tileCodec", name)
            .param("quality", ValueClass::Integer)
            .value("quality", quality_range(lo, hi))
            .build()
            .unwrap()
    };

    let mut set = CapabilitySet::new(false);
    let first = codec("jpeg", 0, 10);
    set.add(first.clone()).unwrap();
    set.add(codec("jpeg", 20, 30)).unwrap();
    set.add(codec("jpeg", 40, 50)).unwrap();

    assert_eq!(set.negotiated_value("tileCodec"), Some(&first));
}

/// A capability mixing all three domain shapes negotiates each parameter
/// independently and fails as a whole when any one of them fails.
#[test]
fn test_mixed_domain_capability() {
    let build = |rates: Negotiable, depth: Negotiable, lossless: Negotiable| {
        Capability::non_preference("tileCodec", "deflate")
            .param("level", ValueClass::Integer)
            .param("bitsPerSample", ValueClass::Integer)
            .param("lossless", ValueClass::Flag)
            .value("level", rates)
            .value("bitsPerSample", depth)
            .value("lossless", lossless)
            .build()
            .unwrap()
    };

    let mine = build(
        quality_range(1, 9),
        int_set([8, 12, 16]),
        Negotiable::single(true),
    );
    let yours = build(
        quality_range(6, 12),
        int_set([16, 8]),
        Negotiable::single(true),
    );

    let agreed = mine.negotiate(&yours).unwrap();
    assert_eq!(agreed.value_of("level"), Some(&quality_range(6, 9)));
    // Intersection keeps the left operand's ordering.
    assert_eq!(agreed.value_of("bitsPerSample"), Some(&int_set([8, 16])));
    assert_eq!(
        agreed.negotiated_value("bitsPerSample").unwrap(),
        Some(ParamValue::Integer(8))
    );

    // One disagreeing flag sinks the whole capability.
    let strict = build(
        quality_range(1, 9),
        int_set([8]),
        Negotiable::single(false),
    );
    assert!(mine.negotiate(&strict).is_none());
}

/// Negotiating a result against an equivalent re-derivation changes
/// nothing: the intersection is already as narrow as it gets.
#[test]
fn test_negotiation_is_stable_under_renegotiation() {
    let mut server = CapabilitySet::new(false);
    server
        .add(
            Capability::non_preference("format", "jpeg")
                .param("quality", ValueClass::Integer)
                .value("quality", quality_range(0, 100))
                .build()
                .unwrap(),
        )
        .unwrap();
    let mut client = CapabilitySet::new(false);
    client
        .add(
            Capability::non_preference("format", "jpeg")
                .param("quality", ValueClass::Integer)
                .value("quality", quality_range(50, 100))
                .build()
                .unwrap(),
        )
        .unwrap();

    let once = server.negotiate(&client).unwrap();
    let again = server.negotiate(&client).unwrap();
    let twice = once.negotiate(&again).unwrap();

    let narrow = |set: &CapabilitySet| {
        set.negotiated_value("format")
            .unwrap()
            .value_of("quality")
            .cloned()
    };
    assert_eq!(narrow(&once), narrow(&twice));
    assert_eq!(narrow(&once), Some(quality_range(50, 100)));
}

/// Capability sets cross the wire; a JSON round trip must preserve
/// priority order, spelling and negotiation behavior.
#[test]
fn test_capability_set_serde_round_trip() -> anyhow::Result<()> {
    let mut server = CapabilitySet::new(false);
    server.add(
        Capability::non_preference("tileCodec", "jpeg")
            .param("Quality", ValueClass::Integer)
            .value("Quality", quality_range(0, 100))
            .generator(Generator::new("TileEncoderFactory"))
            .build()?,
    )?;
    server.add(
        Capability::non_preference("tileCodec", "deflate")
            .param("level", ValueClass::Integer)
            .value("level", quality_range(1, 9))
            .build()?,
    )?;

    let json = serde_json::to_string(&server)?;
    let restored: CapabilitySet = serde_json::from_str(&json)?;

    assert_eq!(restored, server);
    assert_eq!(restored.categories(), ["tileCodec"]);
    assert_eq!(restored.capability_names("tileCodec"), ["jpeg", "deflate"]);
    // Case-retentive spelling survives the wire.
    let jpeg = restored.negotiated_value("tilecodec").unwrap();
    let names: Vec<&str> = jpeg.param_names().collect();
    assert_eq!(names, ["Quality"]);

    // And the restored set negotiates exactly like the original.
    let mut client = CapabilitySet::new(false);
    client.add(
        Capability::non_preference("tileCodec", "jpeg")
            .param("quality", ValueClass::Integer)
            .value("quality", quality_range(50, 100))
            .build()?,
    )?;
    let from_restored = restored.negotiate(&client).unwrap();
    let agreed = from_restored.negotiated_value("tileCodec").unwrap();
    assert_eq!(agreed.value_of("quality"), Some(&quality_range(50, 100)));
    Ok(())
}
