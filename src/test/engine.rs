use crate::config::ControllerConfig;
use crate::ctrl::{
    ControllerEvent, Decision, Directive, DiscoverySnapshot, DropReason, FlowMatch, FlowRule,
    Frame, FrameKind, HostLocation, OutputPort, PacketHandle, PacketIn, PacketOut, RoutingEngine,
};
use crate::emu::Fabric;
use crate::net::{Dpid, NodeId, OFPP_LOCAL, PortNo};
use crate::topo::fat_tree::{FatTree, build_fat_tree};
use std::net::Ipv4Addr;

struct Setup {
    ft: FatTree,
    fabric: Fabric,
    engine: RoutingEngine,
}

impl Setup {
    fn new() -> Self {
        let cfg = ControllerConfig::default();
        let ft = build_fat_tree(cfg.k).unwrap();
        let fabric = Fabric::from_fat_tree(&ft, &cfg.addressing, cfg.max_hops).unwrap();
        let mut engine = RoutingEngine::new(cfg);
        for ev in fabric.startup_events() {
            engine.handle(ev);
        }
        Self { ft, fabric, engine }
    }

    fn ip(&self, h: NodeId) -> Ipv4Addr {
        self.fabric.host_ip(h).unwrap()
    }

    /// (edge dpid, host port)
    fn attach(&self, h: NodeId) -> (Dpid, PortNo) {
        self.fabric.host_attachment(h).unwrap()
    }

    fn uplinks(&self, dpid: Dpid) -> Vec<PortNo> {
        let mut v: Vec<PortNo> = self
            .engine
            .topology()
            .inter_switch_ports(dpid)
            .into_iter()
            .collect();
        v.sort();
        v
    }
}

fn pkt(dpid: Dpid, in_port: PortNo, kind: FrameKind, src: Ipv4Addr, dst: Ipv4Addr) -> PacketIn {
    PacketIn {
        dpid,
        in_port,
        buffer: PacketHandle(42),
        frame: Frame::new(kind, src, dst),
    }
}

#[test]
fn switch_connected_installs_table_miss_rule() {
    let mut engine = RoutingEngine::new(ControllerConfig::default());
    let out = engine.handle(ControllerEvent::SwitchConnected {
        dpid: Dpid(20_000),
        ports: vec![1, 2, 3, OFPP_LOCAL],
    });
    assert_eq!(
        out,
        vec![Directive::InstallRule(FlowRule {
            dpid: Dpid(20_000),
            priority: 0,
            matcher: FlowMatch::All,
            out: OutputPort::Controller,
        })]
    );
    // 没有拓扑时所有端口都视为主机端口，但 LOCAL 端口永远不是
    assert_eq!(
        engine.host_ports(Dpid(20_000)).into_iter().collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

#[test]
fn unknown_destination_at_home_edge_floods_host_ports_except_ingress() {
    let mut s = Setup::new();
    let (a, b) = (s.ft.host(0, 0, 0).unwrap(), s.ft.host(0, 0, 1).unwrap());
    let (edge, a_port) = s.attach(a);
    let (_, b_port) = s.attach(b);

    let p = pkt(edge, a_port, FrameKind::Arp, s.ip(a), s.ip(b));
    let d = s.engine.decide(&p);
    assert_eq!(d, Decision::Flood { ports: vec![b_port] });

    let uplinks = s.uplinks(edge);
    assert_eq!(uplinks.len(), 2);
    if let Decision::Flood { ports } = &d {
        assert!(ports.iter().all(|p| !uplinks.contains(p) && *p != OFPP_LOCAL));
    }
}

#[test]
fn flood_from_uplink_reaches_every_host_port() {
    let mut s = Setup::new();
    let src = s.ft.host(1, 0, 0).unwrap();
    let (a, b) = (s.ft.host(0, 0, 0).unwrap(), s.ft.host(0, 0, 1).unwrap());
    let (edge, a_port) = s.attach(a);
    let (_, b_port) = s.attach(b);
    let uplink = s.uplinks(edge)[0];

    let p = pkt(edge, uplink, FrameKind::Arp, s.ip(src), s.ip(a));
    let out = s.engine.on_packet_in(&p);
    let mut expected = vec![a_port, b_port];
    expected.sort();
    assert_eq!(
        out,
        vec![Directive::PacketOut(PacketOut {
            dpid: edge,
            buffer: PacketHandle(42),
            in_port: uplink,
            ports: expected,
        })]
    );
}

#[test]
fn source_is_learned_only_at_its_home_edge() {
    let mut s = Setup::new();
    let a = s.ft.host(0, 0, 0).unwrap();
    let dst = s.ip(s.ft.host(2, 1, 1).unwrap());
    let agg = s.ft.dpid(s.ft.agg(0, 0).unwrap()).unwrap();
    let (edge, a_port) = s.attach(a);

    s.engine.decide(&pkt(agg, 1, FrameKind::Ipv4, s.ip(a), dst));
    assert!(s.engine.locations().is_empty());

    s.engine.decide(&pkt(edge, a_port, FrameKind::Ipv4, s.ip(a), dst));
    assert_eq!(
        s.engine.locations().get(s.ip(a)),
        Some(HostLocation {
            dpid: edge,
            port: a_port
        })
    );
}

#[test]
fn learned_destination_is_delivered_on_single_port() {
    let mut s = Setup::new();
    let (a, b) = (s.ft.host(0, 0, 0).unwrap(), s.ft.host(0, 0, 1).unwrap());
    let (edge, a_port) = s.attach(a);
    let (_, b_port) = s.attach(b);
    let uplink = s.uplinks(edge)[1];

    // b 先发一个报文，控制器学到 b 的位置
    s.engine
        .decide(&pkt(edge, b_port, FrameKind::Arp, s.ip(b), s.ip(a)));

    let far = s.ip(s.ft.host(3, 0, 0).unwrap());
    let ip_out = s
        .engine
        .on_packet_in(&pkt(edge, uplink, FrameKind::Ipv4, far, s.ip(b)));
    let rule = FlowRule {
        dpid: edge,
        priority: 10,
        matcher: FlowMatch::Ipv4Dst { addr: s.ip(b) },
        out: OutputPort::Physical(b_port),
    };
    assert_eq!(
        ip_out,
        vec![
            Directive::InstallRule(rule),
            Directive::PacketOut(PacketOut {
                dpid: edge,
                buffer: PacketHandle(42),
                in_port: uplink,
                ports: vec![b_port],
            }),
        ]
    );
    assert!(rule.matcher.matches(FrameKind::Ipv4, Some(s.ip(b))));

    // ARP 只转发，不装规则
    let arp = s
        .engine
        .decide(&pkt(edge, a_port, FrameKind::Arp, s.ip(a), s.ip(b)));
    assert_eq!(
        arp,
        Decision::Deliver {
            port: b_port,
            install: None
        }
    );
}

#[test]
fn learned_port_equal_to_ingress_is_not_hairpinned() {
    let mut s = Setup::new();
    let a = s.ft.host(0, 1, 0).unwrap();
    let (edge, a_port) = s.attach(a);
    let other = s.ip(s.ft.host(0, 1, 1).unwrap());

    s.engine
        .decide(&pkt(edge, a_port, FrameKind::Arp, s.ip(a), other));
    let d = s
        .engine
        .decide(&pkt(edge, a_port, FrameKind::Ipv4, other, s.ip(a)));
    assert_eq!(d, Decision::Drop(DropReason::HairpinSuppressed));
}

#[test]
fn remote_destination_installs_subnet_rule_toward_next_hop() {
    let mut s = Setup::new();
    let a = s.ft.host(0, 0, 0).unwrap();
    let b = s.ft.host(1, 1, 1).unwrap();
    let (edge, a_port) = s.attach(a);
    let dst_edge = s.ft.dpid(s.ft.edge(1, 1).unwrap()).unwrap();

    let p = pkt(edge, a_port, FrameKind::Ipv4, s.ip(a), s.ip(b));
    let d = s.engine.decide(&p);
    let Decision::Route { path, port, rule } = d.clone() else {
        panic!("expected route, got {d:?}");
    };
    assert_eq!(path.len(), 5);
    assert_eq!(path.first(), Some(&edge));
    assert_eq!(path.last(), Some(&dst_edge));
    assert_eq!(s.engine.topology().neighbor_port(edge, path[1]), Some(port));
    assert!(s.uplinks(edge).contains(&port));

    assert_eq!(rule.dpid, edge);
    assert_eq!(rule.priority, 10);
    assert_eq!(rule.out, OutputPort::Physical(port));
    assert_eq!(
        rule.matcher,
        FlowMatch::Ipv4DstSubnet {
            network: Ipv4Addr::new(10, 1, 1, 0),
            prefix_len: 24
        }
    );
    // 重复到达同一目的地的报文会被该规则命中
    assert!(rule.matcher.matches(FrameKind::Ipv4, Some(s.ip(b))));
    assert!(!rule.matcher.matches(FrameKind::Arp, Some(s.ip(b))));
    assert!(!rule.matcher.matches(FrameKind::Ipv4, Some(s.ip(a))));

    let out = d.into_directives(&p);
    assert_eq!(out.len(), 2);
    assert!(matches!(out[0], Directive::InstallRule(r) if r == rule));
    assert!(matches!(&out[1], Directive::PacketOut(po) if po.ports == vec![port]));
}

#[test]
fn arp_toward_remote_edge_is_routed_too() {
    let mut s = Setup::new();
    let a = s.ft.host(2, 0, 1).unwrap();
    let b = s.ft.host(3, 1, 0).unwrap();
    let (edge, a_port) = s.attach(a);
    let d = s
        .engine
        .decide(&pkt(edge, a_port, FrameKind::Arp, s.ip(a), s.ip(b)));
    assert!(matches!(d, Decision::Route { .. }), "got {d:?}");
}

#[test]
fn foreign_or_unknown_destinations_are_dropped() {
    let mut s = Setup::new();
    let a = s.ft.host(0, 0, 0).unwrap();
    let (edge, a_port) = s.attach(a);

    for dst in [Ipv4Addr::new(192, 168, 1, 1), Ipv4Addr::new(10, 9, 0, 2)] {
        let p = pkt(edge, a_port, FrameKind::Ipv4, s.ip(a), dst);
        assert_eq!(
            s.engine.decide(&p),
            Decision::Drop(DropReason::UnknownDestination),
            "dst {dst}"
        );
        assert!(s.engine.on_packet_in(&p).is_empty());
    }
}

#[test]
fn lldp_and_unclassified_frames_are_ignored() {
    let mut s = Setup::new();
    let (edge, port) = s.attach(s.ft.host(0, 0, 0).unwrap());
    for frame in [Frame::Lldp, Frame::Other] {
        let p = PacketIn {
            dpid: edge,
            in_port: port,
            buffer: PacketHandle(1),
            frame,
        };
        assert_eq!(s.engine.decide(&p), Decision::Ignore);
        assert!(s.engine.on_packet_in(&p).is_empty());
    }
    assert!(s.engine.locations().is_empty());
}

#[test]
fn partitioned_topology_drops_without_side_effects() {
    let mut s = Setup::new();
    let switches = s.fabric.discovery_snapshot().switches;
    s.engine.handle(ControllerEvent::TopologyRebuilt(DiscoverySnapshot {
        switches,
        links: Vec::new(),
    }));

    let a = s.ft.host(0, 0, 0).unwrap();
    let b = s.ft.host(1, 0, 0).unwrap();
    let (edge, a_port) = s.attach(a);
    let p = pkt(edge, a_port, FrameKind::Ipv4, s.ip(a), s.ip(b));
    assert_eq!(s.engine.decide(&p), Decision::Drop(DropReason::NoRoute));
    assert!(s.engine.on_packet_in(&p).is_empty());
}

#[test]
fn stale_controller_state_never_panics() {
    // 还没收到任何拓扑/端口信息
    let mut engine = RoutingEngine::new(ControllerConfig::default());
    let src = Ipv4Addr::new(10, 0, 0, 2);

    let remote = pkt(Dpid(20_000), 3, FrameKind::Ipv4, src, Ipv4Addr::new(10, 1, 0, 2));
    assert_eq!(
        engine.decide(&remote),
        Decision::Drop(DropReason::UnknownDestination)
    );

    let local = pkt(Dpid(20_000), 3, FrameKind::Arp, src, Ipv4Addr::new(10, 0, 0, 3));
    assert_eq!(engine.decide(&local), Decision::Drop(DropReason::NoHostPorts));
    // 源地址仍然被学习
    assert_eq!(engine.locations().len(), 1);
}

#[test]
fn rebuild_with_empty_snapshot_forgets_topology() {
    let mut s = Setup::new();
    assert_eq!(s.engine.topology().len(), 20);
    s.engine
        .handle(ControllerEvent::TopologyRebuilt(DiscoverySnapshot::default()));
    assert!(s.engine.topology().is_empty());
    assert_eq!(s.engine.topology().link_count(), 0);
}

#[test]
fn relearned_host_is_delivered_on_its_new_port() {
    let mut s = Setup::new();
    let a = s.ft.host(0, 0, 0).unwrap();
    let b = s.ft.host(0, 0, 1).unwrap();
    let (edge, old_port) = s.attach(a);
    let (_, new_port) = s.attach(b);
    assert_ne!(old_port, new_port);
    let far = s.ip(s.ft.host(2, 0, 0).unwrap());

    s.engine
        .decide(&pkt(edge, old_port, FrameKind::Arp, s.ip(a), far));
    assert_eq!(s.engine.locations().get(s.ip(a)).map(|l| l.port), Some(old_port));

    // a 换到另一个主机端口后再次发包
    s.engine
        .decide(&pkt(edge, new_port, FrameKind::Ipv4, s.ip(a), far));
    assert_eq!(
        s.engine.locations().get(s.ip(a)),
        Some(HostLocation {
            dpid: edge,
            port: new_port
        })
    );

    let uplink = s.uplinks(edge)[0];
    let d = s
        .engine
        .decide(&pkt(edge, uplink, FrameKind::Ipv4, far, s.ip(a)));
    assert_eq!(
        d,
        Decision::Deliver {
            port: new_port,
            install: Some(FlowRule {
                dpid: edge,
                priority: 10,
                matcher: FlowMatch::Ipv4Dst { addr: s.ip(a) },
                out: OutputPort::Physical(new_port),
            }),
        }
    );
}
