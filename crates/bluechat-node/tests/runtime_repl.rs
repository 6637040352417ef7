//! Runtime driven by scripted input over an in-process bus.

use std::time::Duration;

use bluechat_core::{ChatService, CoreConfig, LocalBus, LocalLink, MemoryStorage, UnsupportedScanner};
use bluechat_node::{Runtime, SystemEnv};
use bluechat_proto::{DeliveryStatus, Profile};

type Service = ChatService<SystemEnv, MemoryStorage, LocalLink>;

fn service(bus: &LocalBus, name: &str, phone: &str) -> Service {
    let env = SystemEnv::new();
    let storage = MemoryStorage::new();
    Service::onboard(&env, &storage, Profile::new(name, "11", phone).unwrap()).unwrap();
    Service::start(env, storage, bus.link(), CoreConfig::default()).unwrap()
}

async fn drive(service: Service, input: &[u8]) -> (Service, String) {
    let mut out = Vec::new();
    let runtime = Runtime::new(service, SystemEnv::new(), UnsupportedScanner, Duration::from_millis(10));
    let service = runtime.run(input, &mut out).await.unwrap();
    (service, String::from_utf8(out).unwrap())
}

#[tokio::test]
async fn connect_by_index_and_send() {
    let bus = LocalBus::new();
    let mut ana = service(&bus, "Ana", "98765432");
    let mut bia = service(&bus, "Bia", "91234567");
    let ana_id = ana.identity().id;
    let bia_id = bia.identity().id;

    ana.set_radio(true);
    bia.set_radio(true);

    let (ana, out) = drive(ana, b"/peers\n/connect 1\nola\n").await;

    assert!(out.contains("found Bia nearby"), "{out}");
    assert!(out.contains("chatting with Bia"), "{out}");
    assert!(out.contains("you: ola"), "{out}");
    assert!(!ana.is_running());
    assert_eq!(ana.session(bia_id).unwrap().last_message.as_deref(), Some("ola"));

    bia.pump();
    let session = bia.session(ana_id).unwrap();
    assert_eq!(session.peer_name, "Ana");
    assert_eq!(session.messages[0].text, "ola");
    assert_eq!(session.unread_count, 1);
}

#[tokio::test]
async fn inbound_reply_is_rendered_and_acknowledged() {
    let bus = LocalBus::new();
    let mut ana = service(&bus, "Ana", "98765432");
    let mut bia = service(&bus, "Bia", "91234567");
    let ana_id = ana.identity().id;

    ana.set_radio(true);
    bia.set_radio(true);
    bia.pump();
    bia.connect(ana_id).unwrap();
    let sent = bia.send_text(ana_id, "oi").unwrap();

    // Bia's presence and message wait in Ana's queue ahead of the input.
    let (_, out) = drive(ana, b"/sessions\n").await;
    assert!(out.contains("new message from Bia (1 unread)"), "{out}");
    assert!(out.contains("Bia ["), "{out}");

    bia.pump();
    assert_eq!(bia.session(ana_id).unwrap().message(sent).unwrap().status, DeliveryStatus::Delivered);
}

#[tokio::test]
async fn bad_input_is_reported_and_quit_stops_reading() {
    let bus = LocalBus::new();
    let ana = service(&bus, "Ana", "98765432");

    let (ana, out) = drive(ana, b"/bogus\n/connect\nhello\n/radio off\n/scan\n/quit\nnever sent\n").await;

    assert!(out.contains("unknown command: /bogus"), "{out}");
    assert!(out.contains("usage: /connect <n>"), "{out}");
    assert!(out.contains("no active session"), "{out}");
    assert!(out.contains("radio is off"), "{out}");
    assert!(!out.contains("never sent"), "{out}");
    assert!(ana.sessions().is_empty());
}

#[tokio::test]
async fn whoami_shows_handle() {
    let bus = LocalBus::new();
    let ana = service(&bus, "Ana", "98765432");

    let (_, out) = drive(ana, b"/whoami\n").await;

    assert!(out.contains("Ana +55 11 98765432"), "{out}");
}
