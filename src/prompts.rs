//! Prompt templates for the two article kinds.
//!
//! Both prompts ask for one JSON object whose keys match
//! [`ArticleDraft`](crate::models::ArticleDraft). Output is Korean, HTML in
//! `content`, and sized for a Tistory post.

use crate::models::HeadlineItem;

/// Bulleted headline block, one `- title (source)` line per headline.
pub fn headline_block(headlines: &[HeadlineItem]) -> String {
    if headlines.is_empty() {
        return "- (없음)".to_string();
    }
    headlines
        .iter()
        .map(|h| format!("- {} ({})", h.title, h.source))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt for an information-style post built from today's headlines.
pub fn info_article(category_name: &str, headlines: &str) -> String {
    format!(
        r#"당신은 한국어 IT/경제 블로그를 운영하는 전문 작가입니다.
아래는 오늘 수집한 "{category_name}" 분야의 뉴스 헤드라인입니다.

HEADLINES:
{headlines}

할 일:
1. 헤드라인 중 독자가 가장 궁금해할 주제 하나를 고르세요.
2. 그 주제로 1,500~2,500자 분량의 정보형 블로그 글을 쓰세요.
3. 핵심 키워드를 제목과 첫 문단, 소제목에 자연스럽게 넣으세요.
4. 독자 입장에서 "그래서 나에게 무슨 의미인가"를 꼭 설명하세요.

본문 형식:
- HTML만 사용합니다: <h2>, <h3>, <p>, <ul>, <ol>, <li>, <strong>.
- 마크다운, 코드 블록, 이미지 태그는 쓰지 마세요.
- 확인되지 않은 수치나 인용은 지어내지 마세요.

다음 키를 가진 JSON 객체 하나만 출력하세요:
{{
  "title": "클릭하고 싶은 40자 이내 제목",
  "meta_description": "검색 결과에 보일 120자 이내 요약",
  "content": "HTML 본문",
  "tags": ["태그1", "태그2", "태그3", "태그4", "태그5"],
  "category": "{category_name}",
  "selected_topic": "고른 주제 한 줄",
  "trend_summary": "오늘 헤드라인 전체 흐름 한두 문장",
  "reader_perspective": "독자에게 주는 의미 한두 문장"
}}

문자열 안의 큰따옴표는 반드시 \" 로, 줄바꿈은 \n 으로 이스케이프하세요."#
    )
}

/// Prompt for an experience-style post written from a short user memo.
pub fn experience_article(memo: &str, category: &str) -> String {
    format!(
        r#"당신은 솔직한 후기로 사랑받는 한국어 라이프스타일 블로거입니다.
아래 메모는 글쓴이가 직접 겪은 일을 짧게 적은 것입니다.

MEMO:
{memo}

할 일:
1. 메모 내용을 바탕으로 1,500~2,500자 분량의 체험형 블로그 글을 쓰세요.
2. 1인칭 시점으로, 직접 경험한 듯 구체적인 장면과 느낌을 살리세요.
3. 메모에 없는 사실(가격, 주소, 영업시간 등)은 지어내지 말고 [확인 필요]로 표시하세요.
4. 사진이 들어가면 좋을 위치에 <p>[사진: 설명]</p> 자리표시를 넣으세요.

본문 형식:
- HTML만 사용합니다: <h2>, <h3>, <p>, <ul>, <ol>, <li>, <strong>.
- 마크다운과 코드 블록은 쓰지 마세요.

다음 키를 가진 JSON 객체 하나만 출력하세요:
{{
  "title": "40자 이내 제목",
  "meta_description": "검색 결과에 보일 120자 이내 요약",
  "content": "HTML 본문",
  "tags": ["태그1", "태그2", "태그3", "태그4", "태그5"],
  "category": "{category}",
  "photo_count": 본문에 넣은 사진 자리표시 개수(숫자)
}}

문자열 안의 큰따옴표는 반드시 \" 로, 줄바꿈은 \n 으로 이스케이프하세요."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headline_block() {
        let headlines = vec![
            HeadlineItem {
                title: "AI 모델 X 출시".into(),
                source: "연합뉴스".into(),
                locale: "ko-KR".into(),
            },
            HeadlineItem {
                title: "Chips rally".into(),
                source: "Reuters".into(),
                locale: "en-US".into(),
            },
        ];
        assert_eq!(
            headline_block(&headlines),
            "- AI 모델 X 출시 (연합뉴스)\n- Chips rally (Reuters)"
        );
        assert_eq!(headline_block(&[]), "- (없음)");
    }

    #[test]
    fn test_info_prompt_substitutes_inputs() {
        let prompt = info_article("AI/인공지능", "- 헤드라인 (출처)");
        assert!(prompt.contains("\"AI/인공지능\" 분야"));
        assert!(prompt.contains("HEADLINES:\n- 헤드라인 (출처)"));
        assert!(prompt.contains("\"selected_topic\""));
        assert!(prompt.contains("\"category\": \"AI/인공지능\""));
    }

    #[test]
    fn test_experience_prompt_substitutes_inputs() {
        let prompt = experience_article("성수동 카페 방문", "일상/리뷰");
        assert!(prompt.contains("MEMO:\n성수동 카페 방문"));
        assert!(prompt.contains("\"category\": \"일상/리뷰\""));
        assert!(prompt.contains("\"photo_count\""));
    }
}
