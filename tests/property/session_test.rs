// tests/property/session_test.rs

//! Resend always replays the last successful response verbatim.

use crate::test_helpers::TestContext;
use proptest::prelude::*;
use serde_json::json;
use sip2gate::core::protocol::Command;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 16,
        max_shrink_iters: 100,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_resend_replays_last_response(
        logins in prop::collection::vec(("[a-z0-9_]{1,16}", any::<bool>()), 1..5),
        resends in 1usize..4,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ctx = TestContext::new().await;
            let mut client = ctx.connect().await;

            let mut last = String::new();
            for (user, ok) in &logins {
                ctx.backend.respond(Command::Login, json!({ "ok": ok }));
                last = client.exchange(&format!("9300CN{user}|COpw|")).await;
                assert_eq!(last, if *ok { "941|" } else { "940|" });
            }
            for _ in 0..resends {
                assert_eq!(client.exchange("97").await, last);
            }
            assert_eq!(ctx.backend.calls_for(Command::Login).len(), logins.len());
        });
    }
}
