//! Property-based tests for the review loop's core invariants.

use proptest::prelude::*;
use revcal_core::{
    LabeledDoc, MockRankingBackend, NoOpCallback, NoopLock, Qrels, RelevanceJudgment,
    ReviewLoop, RunConfig, RunState, StopReason, StoppingCriteria, StoppingThresholds,
    TrainingSet, TrainingSetStore,
};
use std::collections::HashSet;
use std::sync::Arc;

fn arb_docids(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set("[a-z]{1,6}", 1..max).prop_map(|s| s.into_iter().collect())
}

fn arb_state() -> impl Strategy<Value = RunState> {
    (0usize..50, 0usize..500, 0usize..20).prop_flat_map(|(step, reviewed, zero)| {
        (0..=reviewed).prop_map(move |rel_seen| RunState {
            step,
            docs_reviewed: reviewed,
            rel_seen,
            zero_steps: zero,
            ..RunState::default()
        })
    })
}

fn arb_criteria() -> impl Strategy<Value = StoppingCriteria> {
    (any::<bool>(), 0usize..60, any::<bool>(), prop::option::of(0usize..10)).prop_map(
        |(relstop, max_steps, fail_out, zero_steps)| StoppingCriteria {
            relstop,
            max_steps,
            fail_out,
            zero_steps,
            thresholds: StoppingThresholds::default(),
        },
    )
}

proptest! {
    /// Extending a training set keeps every earlier entry in place and grows it
    /// by exactly the revealed documents.
    #[test]
    fn extend_is_an_ordered_superset(docids in arb_docids(40), split in 0usize..40) {
        let split = split.min(docids.len());
        let (seed, rest) = docids.split_at(split);
        let base = TrainingSet::from_docs(
            "T1",
            0,
            seed.iter().map(|d| LabeledDoc::new(d.clone(), 1)).collect(),
        )
        .unwrap();
        let revealed: Vec<LabeledDoc> =
            rest.iter().map(|d| LabeledDoc::new(d.clone(), 0)).collect();

        let next = base.extend(&revealed).unwrap();
        prop_assert_eq!(next.round(), base.round() + 1);
        prop_assert_eq!(next.len(), base.len() + revealed.len());
        prop_assert_eq!(&next.docs()[..base.len()], base.docs());
        prop_assert!(base.iter().all(|d| next.contains(&d.docid)));
    }

    /// Re-revealing any document already in the set is rejected.
    #[test]
    fn extend_rejects_any_known_docid(
        docids in arb_docids(20),
        pick in any::<prop::sample::Index>(),
    ) {
        let base = TrainingSet::from_docs(
            "T1",
            0,
            docids.iter().map(|d| LabeledDoc::new(d.clone(), 0)).collect(),
        )
        .unwrap();
        let known = pick.get(&docids).clone();
        prop_assert!(base.extend(&[LabeledDoc::new(known, 1)]).is_err());
    }

    /// What the store writes is what it reads back.
    #[test]
    fn store_preserves_order_and_labels(
        docids in arb_docids(30),
        labels in prop::collection::vec(0i32..3, 30),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let store = TrainingSetStore::new(dir.path(), "T1");
        let docs: Vec<LabeledDoc> = docids
            .iter()
            .zip(labels.iter())
            .map(|(d, r)| LabeledDoc::new(d.clone(), *r))
            .collect();
        let set = TrainingSet::from_docs("T1", 3, docs).unwrap();

        store.write(&set).unwrap();
        let back = store.read(3).unwrap();
        prop_assert_eq!(back.docs(), set.docs());
    }

    /// Finding every relevant document always stops the run first when
    /// relstop is on.
    #[test]
    fn all_found_takes_precedence(criteria in arb_criteria(), state in arb_state()) {
        let num_rel = state.rel_seen;
        let verdict = criteria.evaluate(&state, num_rel, 0, true);
        if criteria.relstop {
            prop_assert_eq!(verdict, Some(StopReason::AllRelevantFound));
        } else {
            prop_assert!(verdict.is_some());
        }
    }

    /// The round limit is a hard ceiling unless relstop fires first.
    #[test]
    fn max_steps_is_a_ceiling(criteria in arb_criteria(), state in arb_state()) {
        let num_rel = state.rel_seen + 1;
        let verdict = criteria.evaluate(&state, num_rel, 0, false);
        if state.step >= criteria.max_steps {
            prop_assert_eq!(verdict, Some(StopReason::MaxSteps));
        }
    }

    /// Yield cutoffs never fire unless fail_out is enabled.
    #[test]
    fn yield_cutoffs_need_fail_out(
        criteria in arb_criteria(),
        state in arb_state(),
        new_rel in 0usize..5,
    ) {
        let criteria = StoppingCriteria { fail_out: false, ..criteria };
        let verdict = criteria.evaluate(&state, state.rel_seen + 1, new_rel, false);
        prop_assert!(!matches!(verdict, Some(StopReason::HighYield | StopReason::LowYield)));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Whole runs over random judgments keep the counters consistent with
    /// the persisted training sets.
    #[test]
    fn runs_keep_counters_consistent(
        ranking in arb_docids(30),
        relevant in prop::collection::vec(any::<bool>(), 30),
        seed_size in 1usize..4,
        num_docs in 1usize..4,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let seed_size = seed_size.min(ranking.len());
        let (seed, rest) = ranking.split_at(seed_size);

        let pool: String = seed
            .iter()
            .enumerate()
            .map(|(i, d)| format!("T1 {d} {} run\n", i + 1))
            .collect();
        std::fs::write(dir.path().join("pool.txt"), pool).unwrap();

        let mut qrels = Qrels::new("T1");
        for (docid, rel) in ranking.iter().zip(relevant.iter()) {
            qrels.insert(RelevanceJudgment {
                topic: "T1".into(),
                docid: docid.clone(),
                relevance: i32::from(*rel),
            });
        }
        let num_rel = qrels.total_relevant();

        let config = RunConfig {
            topic: "T1".into(),
            pool: dir.path().join("pool.txt"),
            qrels: dir.path().join("qrels.txt"),
            work_dir: dir.path().to_path_buf(),
            num_docs,
            ..RunConfig::default()
        };
        let backend = Arc::new(MockRankingBackend::new(rest.to_vec()));
        let rl = ReviewLoop::new(&config, qrels, backend, Arc::new(NoopLock));

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let report = runtime.block_on(rl.run(&mut NoOpCallback)).unwrap();

        prop_assert!(report.rel_seen <= num_rel);
        prop_assert!(report.docs_reviewed <= ranking.len());
        let final_set = rl.store().read(report.rounds).unwrap();
        prop_assert_eq!(final_set.len(), report.docs_reviewed);
        prop_assert_eq!(final_set.relevant_count(), report.rel_seen);
        let unique: HashSet<&str> = final_set.iter().map(|d| d.docid.as_str()).collect();
        prop_assert_eq!(unique.len(), final_set.len());

        let reviewed: Vec<usize> = report.history.iter().map(|r| r.docs_reviewed).collect();
        prop_assert!(reviewed.windows(2).all(|w| w[0] <= w[1]));
        let revealed: usize = report.history.iter().map(|r| r.revealed).sum();
        prop_assert_eq!(revealed, report.docs_reviewed);
    }
}
