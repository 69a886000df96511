// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property test: the retrieval loop terminates for any grading sequence.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use bodega_config::model::SelfRagConfig;
use bodega_core::state::ConversationState;
use bodega_rag::SelfRagController;
use bodega_test_utils::{evidence, MockProvider, MockSearch};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// No sequence of yes/no oracle verdicts can keep the controller
    /// looping past its ceiling, and retrieval count stays bounded by
    /// the ceiling too.
    #[test]
    fn controller_always_terminates(verdicts in proptest::collection::vec(any::<bool>(), 64)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        runtime.block_on(async move {
            let ceiling = 4u32;
            // Plenty of result sets so retrieval never runs dry.
            let results = (0..32)
                .map(|i| vec![evidence(&format!("p{i}"), "Some Product", 0.9)])
                .collect();
            let search = Arc::new(MockSearch::with_results(results));

            // Every oracle call consumes one scripted verdict. Grading calls
            // parse it as JSON; generation and rewrite calls treat it as
            // plain text, which is equally valid for them.
            let responses = verdicts
                .iter()
                .map(|yes| {
                    if *yes {
                        r#"{"score": "yes"}"#.to_string()
                    } else {
                        r#"{"score": "no"}"#.to_string()
                    }
                })
                .collect();
            let provider = Arc::new(MockProvider::with_responses(responses));

            let config = SelfRagConfig {
                iteration_ceiling: ceiling,
                ..SelfRagConfig::default()
            };
            let controller = SelfRagController::new(
                Arc::clone(&search) as _,
                provider,
                config,
                128,
                Duration::from_secs(5),
            );

            let mut state = ConversationState::new();
            state.question = "milk".to_string();
            let result = controller.run(&mut state).await;

            prop_assert!(result.is_ok(), "controller must not error: {result:?}");
            prop_assert!(state.iteration_count <= ceiling);
            // One initial retrieval plus at most one per reformulation.
            let queries = search.recorded_queries().await.len() as u32;
            prop_assert!(queries <= ceiling + 1);
            Ok(())
        })?;
    }
}
