use rand::{Rng, seq::SliceRandom};

use crate::models::lesson::{Question, QuestionPool, QuestionType};

/// Fisher–Yates shuffle. The result is always a permutation of the input.
pub fn shuffle_in_place<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// Picks the questions served for one attempt.
///
/// * Disabled pool, or enabled with an empty distribution: the whole bank.
/// * Otherwise `count` random questions per listed type (all of them when the
///   bank has fewer); unlisted types are left out.
///
/// Selected questions keep bank order unless `shuffle_questions` is set.
/// `shuffle_options` reorders choices of MCQ questions only; answers are
/// stored as option text so grading is unaffected.
pub fn sample_questions<R: Rng + ?Sized>(
    questions: &[Question],
    pool: &QuestionPool,
    rng: &mut R,
) -> Vec<Question> {
    let mut selected: Vec<Question> = if !pool.enabled || pool.distribution.is_empty() {
        questions.to_vec()
    } else {
        let mut picked_idx: Vec<usize> = Vec::new();
        for (question_type, &count) in &pool.distribution {
            let candidates: Vec<usize> = questions
                .iter()
                .enumerate()
                .filter(|(_, q)| q.question_type == *question_type)
                .map(|(i, _)| i)
                .collect();
            picked_idx.extend(candidates.choose_multiple(rng, count).copied());
        }
        picked_idx.sort_unstable();
        picked_idx.into_iter().map(|i| questions[i].clone()).collect()
    };

    if pool.shuffle_questions {
        shuffle_in_place(&mut selected, rng);
    }

    if pool.shuffle_options {
        for question in selected
            .iter_mut()
            .filter(|q| q.question_type == QuestionType::MultipleChoice)
        {
            shuffle_in_place(&mut question.options, rng);
        }
    }

    selected
}
