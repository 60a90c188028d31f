#[macro_use]
extern crate criterion;

use std::net::Ipv4Addr;

use criterion::{black_box, BenchmarkId, Criterion, Throughput};

use strom_classify::{Classifier, CosParams, PktioClassifier, PmrMatch, PmrTerm};
use strom_protocols::{FrameBuilder, PacketParser};

/// Interface with `rules` port rules ahead of a DSCP map and a default class.
fn interface(classifier: &Classifier, rules: u16) -> PktioClassifier {
    let pktio = PktioClassifier::new();
    let fallback = classifier.cos_create("default", &CosParams::default()).unwrap();
    classifier.pktio_default_cos_set(&pktio, fallback).unwrap();
    classifier
        .cos_with_l3_qos(&pktio, &[(0x2E, fallback)], true)
        .unwrap();
    for port in 0..rules {
        let cos = classifier
            .cos_create(&format!("port-{port}"), &CosParams::default())
            .unwrap();
        let pmr = classifier
            .pmr_create(&PmrMatch::new(PmrTerm::UdpDport, u64::from(1000 + port), 0xFFFF))
            .unwrap();
        classifier.pktio_pmr_cos(pmr.into(), &pktio, cos).unwrap();
    }
    pktio
}

fn benchmark_select_cos(c: &mut Criterion) {
    let parser = PacketParser::new();
    let frame = FrameBuilder::new()
        .ipv4(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2))
        .dscp(0x2E)
        .udp(5000, 9)
        .build();

    let mut group = c.benchmark_group("select_cos");
    group.throughput(Throughput::Elements(1));
    for rules in [0u16, 4, 8] {
        let classifier = Classifier::default();
        let pktio = interface(&classifier, rules);
        group.bench_with_input(BenchmarkId::new("miss_to_qos", rules), &rules, |b, _| {
            b.iter(|| {
                let pkt = parser.parse(black_box(&frame));
                black_box(classifier.select_cos(&pktio, &pkt).unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_select_cos);
criterion_main!(benches);
