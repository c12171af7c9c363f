//! Plain-text rendering of view output.

use chrono::NaiveDate;
use todo_list::Task;
use todo_list::view::{CalendarCell, CategoryOption, Dashboard};

const WEEKDAYS: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];

/// `[x] #3 Read ch.1 [Math] (Due: 2024-05-01 at 18:00) High`
pub fn task_line(task: &Task) -> String {
    let check = if task.is_completed() { 'x' } else { ' ' };
    let category = task
        .category()
        .map(|category| format!("[{category}] "))
        .unwrap_or_default();
    let reminder = task
        .reminder_time()
        .map(|time| format!(" at {}", time.format("%H:%M")))
        .unwrap_or_default();
    format!(
        "[{check}] #{} {} {category}(Due: {}{reminder}) {}",
        task.id(),
        task.name(),
        task.due_date().format("%Y-%m-%d"),
        task.priority()
    )
}

pub fn dashboard(view: &Dashboard<'_>) -> String {
    let mut lines: Vec<String> = if view.tasks.is_empty() {
        vec!["No tasks.".to_string()]
    } else {
        view.tasks.iter().map(|task| task_line(task)).collect()
    };

    let categories: Vec<String> = view.categories.iter().map(CategoryOption::to_string).collect();
    lines.push(String::new());
    lines.push(format!("Progress: {:.0}%", view.progress_percent));
    lines.push(format!("Completed today: {} / {}", view.completed_today, view.total));
    lines.push(format!("Productivity streak: {} days", view.streak));
    lines.push(format!("Categories: {}", categories.join(", ")));
    lines.join("\n")
}

/// Month grid, today in brackets and days with due tasks starred.
pub fn calendar(first_of_month: NaiveDate, cells: &[CalendarCell]) -> String {
    let mut lines = vec![
        first_of_month.format("%B %Y").to_string(),
        WEEKDAYS.iter().map(|day| format!(" {day}  ")).collect::<String>().trim_end().to_string(),
    ];

    for week in cells.chunks(7) {
        let row: String = week.iter().map(calendar_cell).collect();
        lines.push(row.trim_end().to_string());
    }
    lines.push("[..] today, * tasks due".to_string());
    lines.join("\n")
}

fn calendar_cell(cell: &CalendarCell) -> String {
    match cell {
        CalendarCell::Blank => "     ".to_string(),
        CalendarCell::Day(day) => {
            let (open, close) = if day.is_today { ('[', ']') } else { (' ', ' ') };
            let star = if day.has_tasks() { '*' } else { ' ' };
            format!("{open}{:>2}{star}{close}", day.day())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use todo_list::view::{FilterState, calendar_grid, dashboard as build_dashboard};
    use todo_list::{InMemoryStore, Priority, TaskFields, TaskRepository};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn task_line_shows_all_fields() {
        // Arrange
        let mut repo = TaskRepository::open(InMemoryStore::new());
        let task = repo
            .create(
                TaskFields::new("Read ch.1", date(2024, 5, 1))
                    .with_category("Math")
                    .with_priority(Priority::High)
                    .with_reminder(chrono::NaiveTime::from_hms_opt(18, 0, 0).unwrap()),
            )
            .unwrap();

        // Act
        let line = task_line(&task);

        // Assert
        assert_eq!(line, "[ ] #1 Read ch.1 [Math] (Due: 2024-05-01 at 18:00) High");
    }

    #[test]
    fn task_line_of_plain_task() {
        // Arrange
        let mut repo = TaskRepository::open(InMemoryStore::new());
        let task = repo.create(TaskFields::new("Essay", date(2024, 5, 2))).unwrap();
        let task = repo.toggle_complete(task.id()).unwrap();

        // Act
        let line = task_line(&task);

        // Assert
        assert_eq!(line, "[x] #1 Essay (Due: 2024-05-02) Low");
    }

    #[test]
    fn empty_dashboard_says_no_tasks() {
        // Arrange
        let today = date(2024, 5, 10);
        let view = build_dashboard(&[], &FilterState::new(), today);

        // Act
        let text = dashboard(&view);

        // Assert
        assert!(text.starts_with("No tasks."));
        assert!(text.contains("Progress: 0%"));
        assert!(text.contains("Completed today: 0 / 0"));
        assert!(text.contains("Productivity streak: 0 days"));
        assert!(text.contains("Categories: All Categories"));
    }

    #[test]
    fn calendar_marks_today_and_due_days() {
        // Arrange
        let mut repo = TaskRepository::open(InMemoryStore::new());
        repo.create(TaskFields::new("Quiz", date(2024, 5, 3))).unwrap();
        let today = date(2024, 5, 20);
        let cells = calendar_grid(repo.tasks(), 2024, 5, today).unwrap();

        // Act
        let text = calendar(date(2024, 5, 1), &cells);

        // Assert
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "May 2024");
        assert_eq!(lines[1], " Su   Mo   Tu   We   Th   Fr   Sa");
        // 1 May 2024 is a Wednesday.
        assert_eq!(lines[2], format!("{}1    2    3*   4", " ".repeat(17)));
        assert!(text.contains("[20 ]"));
    }
}
