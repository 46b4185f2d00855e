//! Output locale: every fixed, user-visible string the converter writes.
//!
//! The import target matches database columns by their exact header text,
//! so headers, page-type labels, and the journal date format live together
//! here and are selected as one unit.

use crate::naming::JournalDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Simplified Chinese, matching the stock team template.
    #[default]
    Zh,
    /// English.
    En,
}

/// Fixed strings for one locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Labels {
    /// Ten table headers, in schema order.
    pub headers: [&'static str; 10],
    pub journal_type: &'static str,
    pub article_type: &'static str,
    pub block_ref_placeholder: &'static str,
    pub query_placeholder: &'static str,
    pub default_team_name: &'static str,
    pub default_created_by: &'static str,
    /// Appended to the team name to form the database name.
    pub database_suffix: &'static str,
    pub view_titles: [&'static str; 6],
    pub landing_import_time: &'static str,
    pub landing_database: &'static str,
    pub landing_stats: &'static str,
    pub landing_total: &'static str,
    pub landing_source: &'static str,
}

const ZH: Labels = Labels {
    headers: [
        "名字",
        "开始日期",
        "页面类型",
        "结束日期",
        "相关成员",
        "Created by",
        "内容标签",
        "摘要",
        "状态",
        "进度",
    ],
    journal_type: "日志",
    article_type: "文章",
    block_ref_placeholder: "> [引用块]",
    query_placeholder: "<!-- LogSeq查询已移除 -->",
    default_team_name: "LogSeq导入团队",
    default_created_by: "LogSeq导入",
    database_suffix: "聚合数据库",
    view_titles: ["今日聚合", "全局视角", "项目管理", "任务管理", "会议日志", "Wiki"],
    landing_import_time: "导入时间",
    landing_database: "数据库",
    landing_stats: "导入统计",
    landing_total: "总记录数",
    landing_source: "导入源",
};

const EN: Labels = Labels {
    headers: [
        "Name",
        "Start date",
        "Page type",
        "End date",
        "Related members",
        "Created by",
        "Tags",
        "Summary",
        "Status",
        "Progress",
    ],
    journal_type: "Journal",
    article_type: "Article",
    block_ref_placeholder: "> [Referenced block]",
    query_placeholder: "<!-- LogSeq query removed -->",
    default_team_name: "LogSeq Import",
    default_created_by: "LogSeq import",
    database_suffix: " Database",
    view_titles: ["Today", "Global", "Projects", "Tasks", "Meetings", "Wiki"],
    landing_import_time: "Imported at",
    landing_database: "Database",
    landing_stats: "Import statistics",
    landing_total: "Total entries",
    landing_source: "Source",
};

impl Locale {
    pub fn labels(self) -> &'static Labels {
        match self {
            Locale::Zh => &ZH,
            Locale::En => &EN,
        }
    }

    /// Display name for a journal date. Components keep their digits.
    pub fn journal_title(self, date: &JournalDate) -> String {
        match self {
            Locale::Zh => format!("{}年{}月{}日", date.year, date.month, date.day),
            Locale::En => format!("{}-{}-{}", date.year, date.month, date.day),
        }
    }

    /// Inverse of [`Locale::journal_title`], used to classify pages whose
    /// display name already looks like a journal date.
    pub fn parse_journal_title(self, title: &str) -> Option<JournalDate> {
        match self {
            Locale::Zh => {
                let rest = title.strip_suffix('日')?;
                let (year, rest) = rest.split_once('年')?;
                let (month, day) = rest.split_once('月')?;
                let ok = |s: &str, n: usize| s.len() == n && s.bytes().all(|b| b.is_ascii_digit());
                (ok(year, 4) && ok(month, 2) && ok(day, 2)).then(|| JournalDate {
                    year: year.to_string(),
                    month: month.to_string(),
                    day: day.to_string(),
                })
            }
            Locale::En => crate::naming::parse_journal_key(title),
        }
    }
}
