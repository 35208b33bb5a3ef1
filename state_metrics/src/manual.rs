/*!

This is the long-form manual for `state_metrics` and `fadash`.

## Input data

The dashboard reads one or more tables. Each table has a header row, one
column with the state identifier and any number of numeric columns. The
numeric columns are declared in the configuration: a column that is not
declared is ignored, and a declared column that is absent from the header is
an error for that file.

The state identifier can be the two-letter code (`MS`), the FIPS code (`28`)
or the full name (`Mississippi`). The 50 states, the District of Columbia and
the territories (`AS`, `GU`, `MP`, `PR`, `VI`) are recognized. With the option
`statesOnly`, only the 50 states are kept.

Supported formats:
* `csv` Comma Separated Values. The delimiter can be changed with `delimiter`.
* `xlsx` Excel spreadsheets. The worksheet is selected with `worksheetName`
  (the first worksheet by default).

### Missing values

Blank cells and the labels `NA`, `N/A`, `null`, `-` and `--` are missing
values. The list can be changed per source with `missingLabels`. Negative
numbers are also treated as missing: the public datasets use them to mark
suppressed data.

A missing value is never replaced by zero. It is left out of the rankings and
of the normalization of its metric, and it is displayed as `no data`.

### Warnings and errors

The following problems are reported as warnings and do not stop the loading:
* a row whose state identifier is not recognized (the row is dropped)
* a missing or negative value
* the same value provided twice for a state: the last one is kept

A file that cannot be parsed (wrong delimiter, malformed line, text in a
numeric column) is skipped entirely with an error naming the file and the
line. The dashboard is still displayed with the other files.

## Computations

### Rankings

For a given metric, the states are ordered from the worst value to the best
one. Whether the highest value is the worst one depends on the `polarity` of
the metric (`higherIsWorse` or `higherIsBetter`). Equal values are ordered by
state code.

### Composite scores

A composite score combines several metrics into a single number between 0 and
1, 1 being the worst situation:

1. each metric is normalized across all the states with a value for it:
   `(x - min) / (max - min)`, or `(max - x) / (max - min)` for the metrics
   where a higher value is better
2. the score of a state is the weighted mean of its normalized values

Only the ratios between the weights matter: multiplying all the weights by
the same number does not change the scores. A metric with a weight of zero is
ignored.

If a state lacks some of the weighted metrics, the score is computed with the
others only and is marked as *partial*. If it lacks all of them, it has no
score and is not part of the priority states.

If all the states share the same value for a metric, this metric cannot
separate them: its normalized value is 0 for everyone and the scores report
it in their list of flat metrics.

### Priority states

The priority states are the states with the highest composite scores. With
the default configuration, all the metrics have the same weight, which makes
the composite score the mean of the normalized metrics.

## Configuration

The configuration is a JSON file:

```json
{
  "dashboard": { "title": "Health and Food Access Dashboard", "topN": 10, "priorityN": 5 },
  "metrics": [
    { "name": "OBESITY_CrudePrev", "label": "Obesity Prevalence", "unit": "%",
      "polarity": "higherIsWorse", "source": "health" }
  ],
  "sources": [
    { "provider": "csv", "filePath": "health.csv", "stateColumn": "STATE",
      "metrics": [ { "metric": "OBESITY_CrudePrev" } ] }
  ],
  "weights": { "OBESITY_CrudePrev": 1.0 }
}
```

The file paths are relative to the directory of the configuration file.
See `data/sample/dashboard.json` for a complete example with demographic
breakdowns.

*/
