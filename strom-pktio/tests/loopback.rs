use std::net::Ipv4Addr;
use std::sync::Arc;

use bytes::Bytes;
use tracing_test::traced_test;

use strom_classify::{Classifier, CosParams, Delivery, PmrMatch, PmrTerm};
use strom_config::PktioConfig;
use strom_core::limits::PACKET_HEADROOM;
use strom_core::prelude::*;
use strom_pktio::*;
use strom_protocols::FrameBuilder;

struct Setup {
    core: EventCore,
    nic: Arc<LoopbackAdapter>,
    pktio: Pktio,
    queue: QueueId,
}

fn setup() -> Setup {
    let core = EventCore::init();
    let pool = core
        .pools()
        .pool_create("packets", &PoolParams::packet(16, 256, 0))
        .unwrap();
    let queue = core
        .queues()
        .queue_create(Some("rx"), &QueueParams::parallel(64))
        .unwrap();
    let classifier = Arc::new(Classifier::default());
    let nic = Arc::new(LoopbackAdapter::new(32));
    let pktio = Pktio::from_config(
        "lo0",
        &PktioConfig::default(),
        &core,
        nic.clone(),
        classifier.clone(),
    )
    .unwrap();
    let cos = classifier
        .cos_create("default", &CosParams::new(queue, pool))
        .unwrap();
    classifier.pktio_default_cos_set(pktio.rules(), cos).unwrap();
    Setup {
        core,
        nic,
        pktio,
        queue,
    }
}

fn frame(dport: u16) -> Bytes {
    FrameBuilder::new()
        .ipv4(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2))
        .udp(4000, dport)
        .payload(b"hello")
        .build()
}

#[test]
fn test_frames_loop_back_through_queue() {
    let s = setup();
    s.pktio.start(&s.core).unwrap();

    let sent: Vec<Bytes> = (1..=3).map(frame).collect();
    assert_eq!(s.nic.send(&sent), 3);
    let deliveries = s.pktio.poll(&s.core, 8).unwrap();
    assert_eq!(deliveries.len(), 3);
    assert!(deliveries.iter().all(|d| !d.is_dropped()));

    let handles = s.core.queues().event_dequeue_multi(s.queue, 8).unwrap();
    assert_eq!(handles.len(), 3);
    let transmitted = unsafe { s.pktio.transmit(&s.core, &handles).unwrap() };
    assert_eq!(transmitted, 3);
    assert_eq!(s.nic.recv(8), sent);

    let stats = s.pktio.stats();
    assert_eq!(stats.rx_frames, 3);
    assert_eq!(stats.rx_delivered, 3);
    assert_eq!(stats.tx_frames, 3);
    assert_eq!(s.core.pools().pool_stats(s.pktio.pool()).unwrap().available, 16);
}

#[test]
fn test_poll_requires_start() {
    let s = setup();
    let err = s.pktio.poll(&s.core, 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Usage);

    s.pktio.start(&s.core).unwrap();
    assert!(s.pktio.start(&s.core).is_err());
    s.pktio.stop().unwrap();
    assert_eq!(s.pktio.state(), PktioState::Stopped);
    s.pktio.start(&s.core).unwrap();
}

#[traced_test]
#[test]
fn test_start_rejects_missing_default_cos() {
    let core = EventCore::init();
    let pool = core
        .pools()
        .pool_create("packets", &PoolParams::packet(4, 256, 0))
        .unwrap();
    let pktio = Pktio::open(
        "lo1",
        Arc::new(LoopbackAdapter::new(4)),
        pool,
        Arc::new(Classifier::default()),
    );
    let err = pktio.start(&core).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(pktio.state(), PktioState::Opened);
    assert!(!logs_contain("interface started"));
}

#[test]
fn test_start_rejects_excess_headroom() {
    let s = setup();
    s.pktio
        .classifier()
        .pktio_headroom_set(s.pktio.rules(), PACKET_HEADROOM + 1);
    assert_eq!(
        s.pktio.start(&s.core),
        Err(PktioError::Headroom {
            requested: PACKET_HEADROOM + 1,
            reserved: PACKET_HEADROOM,
        })
    );
}

#[test]
fn test_skip_strips_leading_bytes() {
    let s = setup();
    s.pktio.classifier().pktio_skip_set(s.pktio.rules(), 4);
    s.pktio.start(&s.core).unwrap();

    let mut tagged = vec![0xEE; 4];
    tagged.extend_from_slice(&frame(53));
    s.nic.send(&[Bytes::from(tagged)]);
    let deliveries = s.pktio.poll(&s.core, 1).unwrap();
    let Delivery::Enqueued { handle, .. } = deliveries[0] else {
        panic!("frame dropped");
    };
    let data = unsafe { s.core.pools().packet_to_vec(handle).unwrap() };
    assert_eq!(data, frame(53));
    assert_eq!(
        s.core.pools().packet_headroom(handle),
        Ok(PACKET_HEADROOM as usize + 4)
    );
}

#[test]
fn test_rules_steer_between_queues() {
    let s = setup();
    let dns_q = s
        .core
        .queues()
        .queue_create(Some("dns"), &QueueParams::parallel(8))
        .unwrap();
    let classifier = s.pktio.classifier();
    let dns = classifier
        .cos_create("dns", &CosParams::new(dns_q, s.pktio.pool()))
        .unwrap();
    let pmr = classifier
        .pmr_create(&PmrMatch::new(PmrTerm::UdpDport, 53, 0xFFFF))
        .unwrap();
    classifier.pktio_pmr_cos(pmr.into(), s.pktio.rules(), dns).unwrap();
    s.pktio.start(&s.core).unwrap();

    s.nic.send(&[frame(53), frame(80), frame(53)]);
    s.pktio.poll(&s.core, 8).unwrap();
    assert_eq!(s.core.queues().event_dequeue_multi(dns_q, 8).unwrap().len(), 2);
    assert_eq!(s.core.queues().event_dequeue_multi(s.queue, 8).unwrap().len(), 1);
}

#[test]
fn test_oversized_and_starved_frames_are_counted() {
    let s = setup();
    s.pktio.start(&s.core).unwrap();

    s.nic.send(&[Bytes::from(vec![0u8; 64 * 1024])]);
    assert!(s.pktio.poll(&s.core, 1).unwrap().is_empty());
    assert_eq!(s.pktio.stats().rx_errors, 1);

    let pool = s.pktio.pool();
    let held: Vec<_> = (0..16)
        .map(|_| s.core.pools().packet_alloc(pool, 64).unwrap())
        .collect();
    s.nic.send(&[frame(1)]);
    assert!(s.pktio.poll(&s.core, 1).unwrap().is_empty());
    assert_eq!(s.pktio.stats().rx_dropped, 1);
    s.core.pools().event_free_multi(&held).unwrap();
}

#[test]
fn test_transmit_keeps_refused_packets() {
    let core = EventCore::init();
    let pool = core
        .pools()
        .pool_create("packets", &PoolParams::packet(4, 256, 0))
        .unwrap();
    let classifier = Arc::new(Classifier::new(&strom_config::ClassifierConfig {
        require_default_cos: false,
        ..Default::default()
    }));
    let nic = Arc::new(LoopbackAdapter::new(1));
    let pktio = Pktio::open("lo2", nic.clone(), pool, classifier);
    pktio.start(&core).unwrap();

    let handles: Vec<_> = (0..2)
        .map(|_| core.pools().packet_alloc(pool, 60).unwrap())
        .collect();
    let sent = unsafe { pktio.transmit(&core, &handles).unwrap() };
    assert_eq!(sent, 1);
    assert!(!core.pools().buffer_is_live(handles[0]));
    assert!(core.pools().buffer_is_live(handles[1]));
    assert_eq!(nic.pending(), 1);
}

#[test]
fn test_received_packets_keep_interface_headroom() {
    let s = setup();
    let classifier = s.pktio.classifier();
    classifier.pktio_headroom_set(s.pktio.rules(), PACKET_HEADROOM);
    classifier.pktio_skip_set(s.pktio.rules(), 2);
    s.pktio.start(&s.core).unwrap();

    s.nic.send(&[frame(7), frame(8)]);
    for delivery in s.pktio.poll(&s.core, 4).unwrap() {
        let Delivery::Enqueued { handle, .. } = delivery else {
            panic!("frame dropped");
        };
        let headroom = s.core.pools().packet_headroom(handle).unwrap();
        assert!(headroom >= PACKET_HEADROOM as usize);
    }
}

#[traced_test]
#[test]
fn test_classify_fault_mid_batch_keeps_polling() {
    let s = setup();
    let classifier = s.pktio.classifier();
    let a = classifier
        .cos_create("a", &CosParams::new(s.queue, s.pktio.pool()))
        .unwrap();
    let dns = classifier
        .pmr_create(&PmrMatch::new(PmrTerm::UdpDport, 53, 0xFFFF))
        .unwrap();
    classifier.pktio_pmr_cos(dns.into(), s.pktio.rules(), a).unwrap();
    classifier.cos_pmr_cos(dns.into(), a, a).unwrap();
    s.pktio.start(&s.core).unwrap();

    s.nic.send(&[frame(80), frame(53), frame(81)]);
    let deliveries = s.pktio.poll(&s.core, 8).unwrap();
    assert_eq!(deliveries.len(), 2);
    assert!(deliveries.iter().all(|d| !d.is_dropped()));
    assert!(logs_contain("classification failed"));

    let stats = s.pktio.stats();
    assert_eq!(stats.rx_frames, 3);
    assert_eq!(stats.rx_delivered, 2);
    assert_eq!(stats.rx_errors, 1);

    let queued = s.core.queues().event_dequeue_multi(s.queue, 8).unwrap();
    assert_eq!(queued.len(), 2);
    s.core.pools().event_free_multi(&queued).unwrap();
    assert_eq!(s.core.pools().pool_stats(s.pktio.pool()).unwrap().available, 16);
}
