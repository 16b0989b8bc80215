//! Experiment session: typed UI events in, render instructions out
//!
//! Tab 0 is the live frequency monitor; every further tab is one data view.
//! The session owns the measurement table and is only touched from the UI
//! thread. Views are recomputed from a snapshot of the table.

use crate::config::PlotStyle;
use crate::data::{compute, fit, CellEdit, Column, Expression, FitResult, MeasurementTable, Series, TableError, TransformSpec};
use tracing::{debug, warn};

/// Index of the frequency monitor tab
pub const MONITOR_TAB: usize = 0;

/// Y axis label shared by all data views
pub const FREQUENCY_LABEL: &str = "Frekvens (Hz)";

/// Input from the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    CellEdited { row: usize, column: usize, value: String },
    TabSelected { index: usize },
}

/// Everything needed to draw one data view
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRender {
    /// View index (tab index minus one)
    pub view: usize,
    pub x_label: String,
    pub y_label: &'static str,
    pub series: Series,
    pub fit: Option<FitResult>,
    pub style: PlotStyle,
}

impl ViewRender {
    /// Equation text for the fit overlay
    pub fn equation(&self) -> Option<String> {
        self.fit.map(|f| f.equation())
    }

    /// Fitted y values at each plotted x
    pub fn fit_line(&self) -> Option<Vec<f64>> {
        self.fit.map(|f| f.line_points(&self.series.xs))
    }
}

/// Instruction for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    /// Reset a cell whose text was rejected
    ClearCell { row: usize, column: usize },

    /// Switch to the live monitor
    ShowMonitor,

    PlotSeries(ViewRender),

    /// The view could not be drawn this pass
    SkipRender { view: usize, reason: String },
}

/// One configured data view
#[derive(Debug, Clone, PartialEq)]
pub struct DataView {
    spec: TransformSpec,
    style: PlotStyle,
}

impl DataView {
    pub fn new(spec: TransformSpec, style: PlotStyle) -> Self {
        Self { spec, style }
    }

    pub fn spec(&self) -> &TransformSpec {
        &self.spec
    }

    /// Compute this view's points and, if enabled, its fit
    pub fn render(&self, index: usize, table: &MeasurementTable) -> RenderCommand {
        match compute(table, &self.spec) {
            Ok(series) => {
                let fit = if self.spec.fit_line() {
                    fit(&series.xs, &series.ys)
                } else {
                    None
                };

                RenderCommand::PlotSeries(ViewRender {
                    view: index,
                    x_label: self.spec.x_label().to_string(),
                    y_label: FREQUENCY_LABEL,
                    series,
                    fit,
                    style: self.style.clone(),
                })
            }
            Err(e) => RenderCommand::SkipRender {
                view: index,
                reason: e.to_string(),
            },
        }
    }
}

/// The five classroom views: drive frequency against height, response
/// frequency against mass
pub fn default_views(style: &PlotStyle) -> Vec<DataView> {
    let specs = [
        (Column::Height, Column::DriveFrequency, Expression::identity(), false, "Höjd (mm)", "f_B 1"),
        (Column::Height, Column::DriveFrequency, Expression::reciprocal(), true, "1/Höjd (1/mm)", "f_B 2"),
        (Column::Mass, Column::ResponseFrequency, Expression::identity(), false, "Massa (g)", "f_P 1"),
        (Column::Mass, Column::ResponseFrequency, Expression::reciprocal(), false, "1/Massa (1/g)", "f_P 2"),
        (Column::Mass, Column::ResponseFrequency, Expression::reciprocal_sqrt(), true, "1/√m (1/√g)", "f_P 3"),
    ];

    specs
        .into_iter()
        .map(|(source, target, expression, fit_line, x_label, tab_label)| {
            let spec = TransformSpec::new(source, target, expression, fit_line).with_labels(x_label, tab_label);
            DataView::new(spec, style.clone())
        })
        .collect()
}

/// Session state
#[derive(Debug, Clone)]
pub struct Experiment {
    table: MeasurementTable,
    views: Vec<DataView>,
    selected_tab: usize,
}

impl Default for Experiment {
    fn default() -> Self {
        Self::new(default_views(&PlotStyle::default()))
    }
}

impl Experiment {
    pub fn new(views: Vec<DataView>) -> Self {
        Self {
            table: MeasurementTable::new(),
            views,
            selected_tab: MONITOR_TAB,
        }
    }

    /// Apply one event and return what needs redrawing
    pub fn update(&mut self, event: Event) -> Vec<RenderCommand> {
        match event {
            Event::CellEdited { row, column, value } => self.on_cell_edited(row, column, value),
            Event::TabSelected { index } => self.on_tab_selected(index),
        }
    }

    fn on_cell_edited(&mut self, row: usize, column: usize, value: String) -> Vec<RenderCommand> {
        let mut commands = Vec::new();
        let edit = CellEdit { row, column, text: value };

        match self.table.apply_edit(&edit) {
            Ok(_) => {}
            Err(TableError::InvalidNumber { row, column, .. }) => {
                commands.push(RenderCommand::ClearCell { row, column });
            }
            Err(e) => {
                warn!("ignoring cell edit: {}", e);
                return commands;
            }
        }

        if let Some(view) = self.selected_view() {
            commands.push(self.render_view(view));
        }
        commands
    }

    fn on_tab_selected(&mut self, index: usize) -> Vec<RenderCommand> {
        if index == MONITOR_TAB {
            self.selected_tab = index;
            return vec![RenderCommand::ShowMonitor];
        }
        if index > self.views.len() {
            warn!(index, tabs = self.views.len() + 1, "unknown tab selected");
            return Vec::new();
        }

        self.selected_tab = index;
        vec![self.render_view(index - 1)]
    }

    /// Render one view from a snapshot of the table
    pub fn render_view(&self, view: usize) -> RenderCommand {
        let Some(data_view) = self.views.get(view) else {
            return RenderCommand::SkipRender {
                view,
                reason: format!("no data view {}", view),
            };
        };

        let snapshot = self.table.snapshot();
        let command = data_view.render(view, &snapshot);
        match &command {
            RenderCommand::SkipRender { reason, .. } => warn!(view, "{}", reason),
            RenderCommand::PlotSeries(render) => {
                debug!(view, points = render.series.len(), fit = ?render.fit, "view rendered")
            }
            _ => {}
        }
        command
    }

    /// Render every view, in tab order
    pub fn render_all(&self) -> Vec<RenderCommand> {
        (0..self.views.len()).map(|view| self.render_view(view)).collect()
    }

    /// Currently shown data view, if the monitor is not shown
    pub fn selected_view(&self) -> Option<usize> {
        self.selected_tab.checked_sub(1)
    }

    pub fn selected_tab(&self) -> usize {
        self.selected_tab
    }

    pub fn table(&self) -> &MeasurementTable {
        &self.table
    }

    pub fn views(&self) -> &[DataView] {
        &self.views
    }

    /// Tab labels, monitor first
    pub fn tab_labels(&self) -> Vec<&str> {
        std::iter::once("Frekvensmätare")
            .chain(self.views.iter().map(|v| v.spec().tab_label()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(row: usize, column: Column, value: &str) -> Event {
        Event::CellEdited {
            row,
            column: column.index(),
            value: value.to_string(),
        }
    }

    fn plotted(command: &RenderCommand) -> &ViewRender {
        match command {
            RenderCommand::PlotSeries(render) => render,
            other => panic!("expected PlotSeries, got {:?}", other),
        }
    }

    #[test]
    fn test_default_tabs() {
        let experiment = Experiment::default();
        assert_eq!(
            experiment.tab_labels(),
            vec!["Frekvensmätare", "f_B 1", "f_B 2", "f_P 1", "f_P 2", "f_P 3"]
        );
        assert_eq!(experiment.selected_tab(), MONITOR_TAB);
        assert_eq!(experiment.selected_view(), None);
    }

    #[test]
    fn test_edit_on_monitor_tab_renders_nothing() {
        let mut experiment = Experiment::default();
        let commands = experiment.update(cell(0, Column::Height, "40"));
        assert!(commands.is_empty());
        assert_eq!(experiment.table().get(0, Column::Height), Some(40.0));
    }

    #[test]
    fn test_tab_selection_renders_view_with_fit() {
        let mut experiment = Experiment::default();
        for (row, height, drive) in [(0, "40", "250"), (1, "80", "180"), (2, "50", "230")] {
            experiment.update(cell(row, Column::Height, height));
            experiment.update(cell(row, Column::DriveFrequency, drive));
        }

        // f_B 2: 1/height against drive frequency, with fit
        let commands = experiment.update(Event::TabSelected { index: 2 });
        assert_eq!(commands.len(), 1);

        let render = plotted(&commands[0]);
        assert_eq!(render.view, 1);
        assert_eq!(render.x_label, "1/Höjd (1/mm)");
        assert_eq!(render.y_label, FREQUENCY_LABEL);
        assert_eq!(render.series.xs, vec![0.025, 0.0125, 0.02]);
        assert_eq!(render.series.ys, vec![250.0, 180.0, 230.0]);
        assert!(render.fit.is_some());
        assert!(render.equation().unwrap().starts_with("f(x) = "));
        assert_eq!(render.fit_line().unwrap().len(), 3);
        assert_eq!(render.style, PlotStyle::default());
    }

    #[test]
    fn test_view_without_fit() {
        let mut experiment = Experiment::default();
        experiment.update(cell(0, Column::Height, "40"));
        experiment.update(cell(0, Column::DriveFrequency, "250"));
        experiment.update(cell(1, Column::Height, "80"));
        experiment.update(cell(1, Column::DriveFrequency, "180"));

        let commands = experiment.update(Event::TabSelected { index: 1 });
        let render = plotted(&commands[0]);
        assert_eq!(render.series.xs, vec![40.0, 80.0]);
        assert!(render.fit.is_none());
    }

    #[test]
    fn test_invalid_edit_clears_and_rerenders_active_view() {
        let mut experiment = Experiment::default();
        experiment.update(Event::TabSelected { index: 3 });
        experiment.update(cell(0, Column::Mass, "5"));
        experiment.update(cell(0, Column::ResponseFrequency, "1200"));

        let commands = experiment.update(cell(0, Column::Mass, "abc"));
        assert_eq!(
            commands[0],
            RenderCommand::ClearCell {
                row: 0,
                column: Column::Mass.index()
            }
        );
        assert!(plotted(&commands[1]).series.is_empty());
        assert_eq!(experiment.table().get(0, Column::Mass), None);
    }

    #[test]
    fn test_monitor_and_unknown_tabs() {
        let mut experiment = Experiment::default();
        experiment.update(Event::TabSelected { index: 4 });
        assert_eq!(experiment.selected_view(), Some(3));

        assert!(experiment.update(Event::TabSelected { index: 9 }).is_empty());
        assert_eq!(experiment.selected_tab(), 4);

        assert_eq!(
            experiment.update(Event::TabSelected { index: MONITOR_TAB }),
            vec![RenderCommand::ShowMonitor]
        );
        assert_eq!(experiment.selected_view(), None);
    }

    #[test]
    fn test_out_of_range_edit_ignored() {
        let mut experiment = Experiment::default();
        experiment.update(Event::TabSelected { index: 1 });
        assert!(experiment.update(cell(25, Column::Height, "1")).is_empty());
    }

    #[test]
    fn test_render_all() {
        let experiment = Experiment::default();
        let commands = experiment.render_all();
        assert_eq!(commands.len(), 5);
        assert!(commands.iter().all(|c| matches!(c, RenderCommand::PlotSeries(_))));
    }
}
