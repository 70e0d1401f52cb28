use persona_client::{
    AnalysisResult, AnalysisStatistics, EvaluatedMovie, Movie, Progress, SearchOutcome,
    SearchSource, TriggerSummary,
};

const BAR_WIDTH: usize = 20;
const LABEL_WIDTH: usize = 12;

/// `[■■■□□] 3/5`, capped at full once the minimum is reached.
pub fn progress(progress: &Progress) -> String {
    let filled = progress.evaluated.min(progress.required);
    let mut line = format!(
        "[{}{}] {}/{}",
        "■".repeat(filled),
        "□".repeat(progress.required - filled),
        progress.evaluated,
        progress.required
    );
    if progress.can_analyze {
        line.push_str("  분석 가능");
    } else {
        line.push_str(&format!("  {}편 더 평가하세요", progress.remaining));
    }
    line
}

/// Horizontal bar for a score in `[0, 1]`; out-of-range scores are drawn clamped.
pub fn score_bar(label: &str, score: f64) -> String {
    let clamped = score.clamp(0.0, 1.0);
    let filled = (clamped * BAR_WIDTH as f64).round() as usize;
    let pad = LABEL_WIDTH.saturating_sub(display_width(label));
    format!(
        "{label}{}{}{} {:>3}%",
        " ".repeat(pad),
        "█".repeat(filled),
        "░".repeat(BAR_WIDTH - filled),
        (clamped * 100.0).round() as u32
    )
}

pub fn movie_line(movie: &Movie) -> String {
    let mut line = format!("#{:<6} {}", movie.id, movie.title);
    if let Some(date) = movie.release_date {
        line.push_str(&format!(" ({})", date.format("%Y")));
    }
    if let Some(average) = movie.vote_average {
        line.push_str(&format!("  ★ {average:.1}"));
    }
    if !movie.genres.is_empty() {
        line.push_str(&format!("  [{}]", movie.genres.join(", ")));
    }
    line
}

pub fn search(outcome: &SearchOutcome) -> String {
    let source = match outcome.source {
        SearchSource::Local => "catalog",
        SearchSource::External => "external lookup",
    };
    let mut out = format!("{} ({source})\n", outcome.message);
    for movie in &outcome.movies {
        out.push_str(&movie_line(movie));
        out.push('\n');
    }
    out
}

pub fn evaluated(movies: &[EvaluatedMovie], progress_line: &Progress) -> String {
    let mut out = String::new();
    for entry in movies {
        out.push_str(&format!(
            "{}  {}\n",
            entry.rating.stars(),
            movie_line(&entry.movie)
        ));
    }
    out.push_str(&progress(progress_line));
    out.push('\n');
    out
}

pub fn summary(summary: &TriggerSummary) -> String {
    format!(
        "분석 완료: {}편 분석, 신뢰도 {}%\n",
        summary.movies_analyzed, summary.confidence_percent
    )
}

pub fn result(result: &AnalysisResult) -> String {
    let mut out = format!(
        "분석한 영화: {}편   신뢰도: {}%\n",
        result.movies_analyzed,
        result.confidence_percent()
    );
    if !result.message.is_empty() {
        out.push_str(&result.message);
        out.push('\n');
    }

    out.push_str("\n성격 특성 (Big Five)\n");
    for (t, score) in result.personality.entries() {
        out.push_str(&score_bar(t.label(), score));
        out.push('\n');
    }
    out.push_str(&format!(
        "가장 두드러진 특성: {}\n",
        result.personality.dominant().label()
    ));

    out.push_str("\n가치관\n");
    for (dimension, score) in result.values.entries() {
        out.push_str(&score_bar(dimension.label(), score));
        out.push('\n');
    }

    if let Some(text) = &result.summary {
        out.push('\n');
        out.push_str(text);
        out.push('\n');
    }
    out
}

pub fn statistics(stats: &AnalysisStatistics) -> String {
    format!(
        "평가한 영화: {}편 (최소 {}편)\n분석 가능: {}\n",
        stats.total_movies_rated,
        stats.min_movies_required,
        if stats.analysis_ready { "예" } else { "아니오" }
    )
}

/// Terminal columns, counting Hangul and other wide characters as two.
fn display_width(text: &str) -> usize {
    text.chars()
        .map(|c| if (c as u32) >= 0x1100 { 2 } else { 1 })
        .sum()
}
